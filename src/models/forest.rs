//! Random Forest implementation

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::{check_fit_shapes, check_n_features, encode_classes, with_pool, Classifier};
use super::tree::DecisionTree;
use crate::constants::DEFAULT_MODEL_SEED;
use crate::error::{Result, TunerError};

/// Features considered at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    /// No constraint: every feature is considered.
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Bagged ensemble of classification trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub random_state: u64,
    /// Threads used while fitting; `None` uses every core.
    #[serde(skip)]
    pub n_jobs: Option<usize>,
    classes: Vec<f64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            random_state: DEFAULT_MODEL_SEED,
            n_jobs: None,
            classes: Vec::new(),
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
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

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn fit_tree(
        &self,
        tree_idx: usize,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        max_features: usize,
    ) -> Result<DecisionTree> {
        let seed = self.random_state.wrapping_add(tree_idx as u64);
        let mut rng = StdRng::seed_from_u64(seed);
        let n_samples = x.nrows();

        let mut tree = DecisionTree::new_classifier()
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_features(Some(max_features))
            .with_random_state(rng.r#gen());

        if self.bootstrap {
            let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
            let x_boot = x.select(Axis(0), &sample);
            let y_boot: Vec<usize> = sample.iter().map(|&i| y[i]).collect();
            tree.fit_classes(&x_boot, &y_boot, n_classes)?;
        } else {
            tree.fit_classes(x, y, n_classes)?;
        }
        Ok(tree)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                total += imp;
            }
        }
        let sum = total.sum();
        if sum > 0.0 {
            total /= sum;
        }
        self.feature_importances = Some(total);
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_fit_shapes(x, y)?;
        if self.n_estimators == 0 {
            return Err(TunerError::InvalidInput("n_estimators must be positive".to_string()));
        }

        let (classes, encoded) = encode_classes(y)?;
        let n_classes = classes.len();
        let max_features = self.max_features.resolve(x.ncols());

        let trees = with_pool(self.n_jobs, || {
            (0..self.n_estimators)
                .into_par_iter()
                .map(|tree_idx| self.fit_tree(tree_idx, x, &encoded, n_classes, max_features))
                .collect::<Result<Vec<_>>>()
        })??;

        debug!(
            trees = trees.len(),
            max_features,
            classes = n_classes,
            "fitted random forest"
        );

        self.trees = trees;
        self.classes = classes;
        self.n_features = x.ncols();
        self.compute_feature_importances();
        Ok(())
    }

    /// Mean of the trees' leaf class proportions.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(TunerError::ModelNotFitted);
        }
        check_n_features(self.n_features, x)?;

        let per_tree = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_values(x))
            .collect::<Result<Vec<_>>>()?;

        let mut proba = Array2::zeros((x.nrows(), self.classes.len()));
        for p in &per_tree {
            proba += p;
        }
        proba /= per_tree.len() as f64;
        Ok(proba)
    }

    fn classes(&self) -> &[f64] {
        &self.classes
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0, 3.0],
            [0.1, 0.2, 1.0],
            [0.2, 0.1, 2.0],
            [0.3, 0.3, 3.0],
            [1.0, 1.0, 1.0],
            [1.1, 0.9, 2.0],
            [1.2, 1.2, 3.0],
            [0.9, 1.1, 1.0],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_classifier_accuracy() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(20).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(p, a)| p == a).count();
        assert!(correct >= 7, "accuracy too low: {}/8", correct);
        assert_eq!(rf.n_trees(), 20);
    }

    #[test]
    fn test_predict_proba_rows_sum_to_one() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(10).with_max_features(MaxFeatures::All);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 2);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_deterministic_across_thread_counts() {
        let (x, y) = blobs();
        let mut a = RandomForest::new(15).with_random_state(7).with_n_jobs(Some(1));
        let mut b = RandomForest::new(15).with_random_state(7).with_n_jobs(Some(4));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_importances_normalized() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new(10).with_bootstrap(false);
        rf.fit(&x, &y).unwrap();

        let imp = rf.feature_importances().unwrap();
        assert_eq!(imp.len(), 3);
        assert!((imp.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(16), 4);
        assert_eq!(MaxFeatures::Log2.resolve(16), 4);
        assert_eq!(MaxFeatures::All.resolve(16), 16);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
    }

    #[test]
    fn test_predict_before_fit() {
        let rf = RandomForest::new(5);
        assert!(matches!(
            rf.predict(&array![[0.0, 0.0, 0.0]]),
            Err(TunerError::ModelNotFitted)
        ));
    }
}
