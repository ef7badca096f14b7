//! Multinomial logistic regression fitted by full-batch gradient descent
//! with a backtracking line search.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{
    check_fit_shapes, check_n_features, encode_classes, softmax_rows, Classifier,
};
use crate::error::{Result, TunerError};

/// Sufficient-decrease constant for the line search.
const ARMIJO_C: f64 = 1e-4;
const INITIAL_STEP: f64 = 1.0;
const MIN_STEP: f64 = 1e-10;

/// Mean negative log-likelihood of one-hot targets.
fn cross_entropy(proba: &Array2<f64>, onehot: &Array2<f64>) -> f64 {
    -(proba.mapv(|p| p.max(f64::MIN_POSITIVE).ln()) * onehot).sum() / proba.nrows() as f64
}

fn penalized_loss(
    xs: &Array2<f64>,
    onehot: &Array2<f64>,
    weights: &Array2<f64>,
    intercept: &Array1<f64>,
    penalty: f64,
) -> f64 {
    let mut proba = xs.dot(weights) + intercept;
    softmax_rows(&mut proba);
    cross_entropy(&proba, onehot) + 0.5 * penalty * weights.mapv(|v| v * v).sum()
}

/// Logistic regression with L2 penalty `1 / C`, trained on standardized features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    pub fit_intercept: bool,
    /// Gradient-norm convergence tolerance.
    pub tol: f64,
    /// `(n_features, n_classes)`
    weights: Option<Array2<f64>>,
    intercept: Option<Array1<f64>>,
    mean: Array1<f64>,
    scale: Array1<f64>,
    classes: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            fit_intercept: true,
            tol: 1e-4,
            weights: None,
            intercept: None,
            mean: Array1::zeros(0),
            scale: Array1::zeros(0),
            classes: Vec::new(),
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.scale
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        if !(self.c > 0.0) {
            return Err(TunerError::InvalidInput(format!("C must be positive, got {}", self.c)));
        }

        let (classes, encoded) = encode_classes(y)?;
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let n_classes = classes.len();

        self.mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_features));
        self.scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let xs = self.standardize(x);

        let mut onehot = Array2::<f64>::zeros((n_samples, n_classes));
        for (i, &c) in encoded.iter().enumerate() {
            onehot[[i, c]] = 1.0;
        }

        let n = n_samples as f64;
        let penalty = 1.0 / (self.c * n);

        let mut weights = Array2::<f64>::zeros((n_features, n_classes));
        let mut intercept = Array1::<f64>::zeros(n_classes);
        let mut step = INITIAL_STEP;
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;

            let mut proba = xs.dot(&weights) + &intercept;
            softmax_rows(&mut proba);
            let loss = cross_entropy(&proba, &onehot) + 0.5 * penalty * weights.mapv(|v| v * v).sum();
            let errors = proba - &onehot;

            let grad_w = xs.t().dot(&errors) / n + &weights * penalty;
            let grad_b = if self.fit_intercept {
                errors.sum_axis(Axis(0)) / n
            } else {
                Array1::zeros(n_classes)
            };

            let norm_sq = grad_w.mapv(|v| v * v).sum() + grad_b.mapv(|v| v * v).sum();
            if norm_sq.sqrt() < self.tol {
                break;
            }

            // Backtracking line search; the step may grow again after a success.
            step *= 2.0;
            loop {
                let next_w = &weights - &(&grad_w * step);
                let next_b = &intercept - &(&grad_b * step);
                let next_loss = penalized_loss(&xs, &onehot, &next_w, &next_b, penalty);
                if next_loss <= loss - ARMIJO_C * step * norm_sq || step < MIN_STEP {
                    weights = next_w;
                    intercept = next_b;
                    break;
                }
                step *= 0.5;
            }
        }

        debug!(iterations, classes = n_classes, c = self.c, "fitted logistic regression");

        self.weights = Some(weights);
        self.intercept = Some(intercept);
        self.classes = classes;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (weights, intercept) = match (&self.weights, &self.intercept) {
            (Some(w), Some(b)) => (w, b),
            _ => return Err(TunerError::ModelNotFitted),
        };
        check_n_features(weights.nrows(), x)?;

        let mut proba = self.standardize(x).dot(weights) + intercept;
        softmax_rows(&mut proba);
        Ok(proba)
    }

    fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Mean absolute standardized coefficient per feature.
    fn feature_importances(&self) -> Option<Array1<f64>> {
        let weights = self.weights.as_ref()?;
        let mut imp = weights.mapv(f64::abs).mean_axis(Axis(1))?;
        let sum = imp.sum();
        if sum > 0.0 {
            imp /= sum;
        }
        Some(imp)
    }
}
