//! Gradient boosted trees with a softmax loss.
//!
//! Each round fits one regression tree per class on the negative gradient
//! `onehot - softmax(F)`, on a row and column subsample.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{
    check_fit_shapes, check_n_features, encode_classes, softmax_rows, with_pool, Classifier,
};
use super::tree::DecisionTree;
use crate::constants::DEFAULT_MODEL_SEED;
use crate::error::{Result, TunerError};

/// Trees fitted in one boosting round, all on the same column subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoostRound {
    columns: Vec<usize>,
    /// One tree per class.
    trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows drawn (without replacement) per round.
    pub subsample: f64,
    /// Fraction of columns drawn per round.
    pub colsample: f64,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    #[serde(skip)]
    pub n_jobs: Option<usize>,
    rounds: Vec<BoostRound>,
    /// Log class priors.
    init: Array1<f64>,
    classes: Vec<f64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self::new(100)
    }
}

impl GradientBoosting {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            colsample: 1.0,
            min_samples_leaf: 1,
            random_state: DEFAULT_MODEL_SEED,
            n_jobs: None,
            rounds: Vec::new(),
            init: Array1::zeros(0),
            classes: Vec::new(),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_subsample(mut self, ratio: f64) -> Self {
        self.subsample = ratio;
        self
    }

    pub fn with_colsample(mut self, ratio: f64) -> Self {
        self.colsample = ratio;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(TunerError::InvalidInput("n_estimators must be positive".to_string()));
        }
        for (name, ratio) in [("subsample", self.subsample), ("colsample", self.colsample)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(TunerError::InvalidInput(format!(
                    "{} must be in (0, 1], got {}",
                    name, ratio
                )));
            }
        }
        if !(self.learning_rate > 0.0) {
            return Err(TunerError::InvalidInput(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }

    fn draw(rng: &mut StdRng, n: usize, ratio: f64) -> Vec<usize> {
        let k = ((n as f64) * ratio).ceil() as usize;
        let mut picked = sample(rng, n, k.clamp(1, n)).into_vec();
        picked.sort_unstable();
        picked
    }

    fn fit_rounds(&mut self, x: &Array2<f64>, encoded: &[usize], n_classes: usize) -> Result<()> {
        let n_samples = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.random_state);

        let mut onehot = Array2::<f64>::zeros((n_samples, n_classes));
        for (i, &c) in encoded.iter().enumerate() {
            onehot[[i, c]] = 1.0;
        }

        let priors = onehot.sum_axis(Axis(0)) / n_samples as f64;
        self.init = priors.mapv(|p| p.max(1e-12).ln());

        let mut scores = Array2::from_shape_fn((n_samples, n_classes), |(_, k)| self.init[k]);
        let mut importances = Array1::<f64>::zeros(x.ncols());
        let mut rounds = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let mut proba = scores.clone();
            softmax_rows(&mut proba);
            let residuals = &onehot - &proba;

            let rows = Self::draw(&mut rng, n_samples, self.subsample);
            let columns = Self::draw(&mut rng, x.ncols(), self.colsample);
            let x_sub = x.select(Axis(0), &rows).select(Axis(1), &columns);
            let x_cols = x.select(Axis(1), &columns);

            let trees = (0..n_classes)
                .into_par_iter()
                .map(|k| -> Result<DecisionTree> {
                    let target: Vec<f64> = rows.iter().map(|&i| residuals[[i, k]]).collect();
                    let mut tree = DecisionTree::new_regressor()
                        .with_max_depth(Some(self.max_depth))
                        .with_min_samples_leaf(self.min_samples_leaf);
                    tree.fit_values(&x_sub, &target)?;
                    Ok(tree)
                })
                .collect::<Result<Vec<_>>>()?;

            for (k, tree) in trees.iter().enumerate() {
                let update = tree.predict_values(&x_cols)?;
                scores
                    .column_mut(k)
                    .scaled_add(self.learning_rate, &update.column(0));
                if let Some(imp) = tree.feature_importances() {
                    for (j, &col) in columns.iter().enumerate() {
                        importances[col] += imp[j];
                    }
                }
            }

            rounds.push(BoostRound { columns, trees });
        }

        let total = importances.sum();
        if total > 0.0 {
            importances /= total;
        }

        self.rounds = rounds;
        self.feature_importances = Some(importances);
        Ok(())
    }
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        self.validate()?;
        if x.ncols() == 0 {
            return Err(TunerError::InvalidInput("no feature columns".to_string()));
        }

        let (classes, encoded) = encode_classes(y)?;
        let n_classes = classes.len();

        let n_jobs = self.n_jobs;
        with_pool(n_jobs, || self.fit_rounds(x, &encoded, n_classes))??;

        debug!(
            rounds = self.rounds.len(),
            classes = n_classes,
            learning_rate = self.learning_rate,
            "fitted gradient boosting"
        );

        self.classes = classes;
        self.n_features = x.ncols();
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.rounds.is_empty() {
            return Err(TunerError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        let n_classes = self.classes.len();
        let mut scores = Array2::from_shape_fn((x.nrows(), n_classes), |(_, k)| self.init[k]);

        for round in &self.rounds {
            let x_cols = x.select(Axis(1), &round.columns);
            for (k, tree) in round.trees.iter().enumerate() {
                let update = tree.predict_values(&x_cols)?;
                scores
                    .column_mut(k)
                    .scaled_add(self.learning_rate, &update.column(0));
            }
        }

        softmax_rows(&mut scores);
        Ok(scores)
    }

    fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}
