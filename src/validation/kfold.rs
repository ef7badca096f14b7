//! Cross-validation splitting and scoring.

use tracing::debug;

use crate::data::Dataset;
use crate::error::{Result, TunerError};
use crate::models::Classifier;
use crate::validation::metrics::accuracy;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Stratified k-fold without shuffling.
///
/// Samples are assigned to folds class by class in their original order so
/// that every fold receives as even a share of each class as possible.
#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    pub n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn split(&self, labels: &[f64]) -> Result<Vec<CvSplit>> {
        let n_samples = labels.len();
        let n_splits = self.n_splits;

        if n_splits < 2 {
            return Err(TunerError::InvalidInput(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(TunerError::InvalidInput(format!(
                "cannot split {} samples into {} folds",
                n_samples, n_splits
            )));
        }

        // Classes are numbered by first appearance, which fixes the order
        // they are dealt into folds below.
        let mut classes: Vec<f64> = Vec::new();
        let mut encoded = Vec::with_capacity(n_samples);
        for &v in labels {
            let code = match classes.iter().position(|&c| c == v) {
                Some(code) => code,
                None => {
                    classes.push(v);
                    classes.len() - 1
                }
            };
            encoded.push(code);
        }
        let n_classes = classes.len();

        let mut class_counts = vec![0usize; n_classes];
        for &c in &encoded {
            class_counts[c] += 1;
        }
        if class_counts.iter().all(|&c| c < n_splits) {
            return Err(TunerError::InvalidInput(format!(
                "n_splits={} is greater than the number of members in every class",
                n_splits
            )));
        }

        // Deal the class-sorted samples round-robin to decide how many of each
        // class every fold receives.
        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; n_splits];
        for (pos, &c) in sorted.iter().enumerate() {
            allocation[pos % n_splits][c] += 1;
        }

        let mut test_fold = vec![0usize; n_samples];
        for class in 0..n_classes {
            let mut folds = (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class]));
            for (i, _) in encoded.iter().enumerate().filter(|(_, c)| **c == class) {
                test_fold[i] = folds.next().unwrap_or(n_splits - 1);
            }
        }

        Ok((0..n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| test_fold[i] == fold_idx);
                CvSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect())
    }
}

/// Accuracy of a fresh clone of `estimator` on each fold of `data`.
///
/// The estimator is cloned and refit per fold; the original is left untouched.
pub fn cross_val_score<C>(estimator: &C, data: &Dataset, cv: &StratifiedKFold) -> Result<Vec<f64>>
where
    C: Classifier + Clone,
{
    let labels = data.labels().to_vec();
    let splits = cv.split(&labels)?;

    let mut scores = Vec::with_capacity(splits.len());
    for split in splits {
        let train = data.select(&split.train_indices);
        let test = data.select(&split.test_indices);

        let mut model = estimator.clone();
        model.fit(train.features(), train.labels())?;
        let predicted = model.predict(test.features())?;
        let score = accuracy(test.labels(), &predicted)?;

        debug!(fold = split.fold_idx, score, "scored fold");
        scores.push(score);
    }
    Ok(scores)
}
