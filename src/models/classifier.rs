use ndarray::{Array1, Array2};

use crate::error::{Result, TunerError};

/// Seam between the workflows and the estimators.
pub trait Classifier {
    /// Fit on `x` with labels `y`. Refitting replaces all learned state.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Class probabilities shaped `(n_samples, n_classes)`, columns ordered as [`Classifier::classes`].
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Sorted label values seen during fit.
    fn classes(&self) -> &[f64];

    /// Normalized per-feature importances, if the model is fitted.
    fn feature_importances(&self) -> Option<Array1<f64>>;

    /// Most probable label per row.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let classes = self.classes();
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| classes[argmax(row.iter().copied())])
            .collect())
    }
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}

/// Sorted distinct labels and each sample's index into them.
pub(crate) fn encode_classes(y: &Array1<f64>) -> Result<(Vec<f64>, Vec<usize>)> {
    if y.is_empty() {
        return Err(TunerError::EmptyDataset("training labels".to_string()));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(TunerError::InvalidInput("labels must be finite".to_string()));
    }

    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();

    let encoded = y
        .iter()
        .map(|v| classes.partition_point(|c| c < v))
        .collect();
    Ok((classes, encoded))
}

pub(crate) fn check_fit_shapes(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TunerError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    Ok(())
}

pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(TunerError::Shape {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

/// Run `f` on a dedicated pool of `n_jobs` threads, or on the global pool when `None`.
pub(crate) fn with_pool<T, F>(n_jobs: Option<usize>, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match n_jobs {
        None => Ok(f()),
        Some(n) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(n.max(1)).build()?;
            Ok(pool.install(f))
        }
    }
}

/// Row-wise softmax in place.
pub(crate) fn softmax_rows(scores: &mut Array2<f64>) {
    for mut row in scores.rows_mut() {
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_encode_classes() {
        let (classes, encoded) = encode_classes(&array![2.0, 0.0, 2.0, 1.0]).unwrap();
        assert_eq!(classes, vec![0.0, 1.0, 2.0]);
        assert_eq!(encoded, vec![2, 0, 2, 1]);
    }

    #[test]
    fn test_encode_rejects_empty() {
        assert!(encode_classes(&Array1::zeros(0)).is_err());
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax([0.2, 0.5, 0.5].into_iter()), 1);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut scores = array![[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]];
        softmax_rows(&mut scores);
        for row in scores.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert!((scores[[1, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }
}
