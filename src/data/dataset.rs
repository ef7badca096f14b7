use ndarray::{Array1, Array2, Axis};
use sha2::{Digest, Sha256};

use crate::error::{Result, TunerError};

/// A feature table with its labels.
///
/// Rows of `features` line up with `labels`; columns line up with `feature_names`.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Array1<f64>,
    feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(features: Array2<f64>, labels: Array1<f64>, feature_names: Vec<String>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(TunerError::Shape {
                expected: format!("{} labels", features.nrows()),
                actual: format!("{} labels", labels.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(TunerError::Shape {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    /// Build a dataset with generated column names (`f0`, `f1`, ...).
    pub fn unnamed(features: Array2<f64>, labels: Array1<f64>) -> Result<Self> {
        let names = (0..features.ncols()).map(|i| format!("f{}", i)).collect();
        Self::new(features, labels, names)
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    /// Sorted distinct label values.
    pub fn classes(&self) -> Vec<f64> {
        let mut classes: Vec<f64> = self.labels.iter().copied().collect();
        classes.sort_by(|a, b| a.total_cmp(b));
        classes.dedup();
        classes
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            feature_names: self.feature_names.clone(),
        }
    }

    /// SHA-256 over column names, shape, feature values and labels.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in &self.feature_names {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update((self.n_samples() as u64).to_le_bytes());
        hasher.update((self.n_features() as u64).to_le_bytes());
        for v in self.features.iter() {
            hasher.update(v.to_le_bytes());
        }
        for v in self.labels.iter() {
            hasher.update(v.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Train and test partitions produced by a data provider.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Dataset,
    pub test: Dataset,
}

impl DataSplit {
    /// Both partitions must carry the same columns in the same order.
    pub fn new(train: Dataset, test: Dataset) -> Result<Self> {
        if train.feature_names != test.feature_names {
            return Err(TunerError::Shape {
                expected: format!("test columns {:?}", train.feature_names),
                actual: format!("test columns {:?}", test.feature_names),
            });
        }
        Ok(Self { train, test })
    }
}
