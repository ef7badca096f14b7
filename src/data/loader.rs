use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::constants::{DEFAULT_SPLIT_SEED, DEFAULT_TEST_RATIO};
use crate::data::dataset::{DataSplit, Dataset};
use crate::error::{Result, TunerError};

/// Source of the four-way train/test split.
///
/// Implementations must be deterministic: repeated calls within a run return
/// the same split.
pub trait DataProvider {
    fn load(&self) -> Result<DataSplit>;
}

/// Reads a headed CSV file and performs a seeded, stratified train/test split.
#[derive(Debug, Clone)]
pub struct CsvProvider {
    pub path: PathBuf,
    pub target: String,
    pub test_ratio: f64,
    pub seed: u64,
}

impl CsvProvider {
    pub fn new(path: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            test_ratio: DEFAULT_TEST_RATIO,
            seed: DEFAULT_SPLIT_SEED,
        }
    }

    pub fn with_test_ratio(mut self, ratio: f64) -> Self {
        self.test_ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl DataProvider for CsvProvider {
    fn load(&self) -> Result<DataSplit> {
        let dataset = load_csv(&self.path, &self.target)?;
        info!(
            path = %self.path.display(),
            rows = dataset.n_samples(),
            features = dataset.n_features(),
            "loaded dataset"
        );
        train_test_split(&dataset, self.test_ratio, self.seed)
    }
}

/// Load a CSV file whose `target` column holds the labels.
///
/// Feature columns must be numeric. Labels may be numeric or strings; string
/// labels are encoded as their index in sorted order.
pub fn load_csv<P: AsRef<Path>>(path: P, target: &str) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let target_idx = headers.iter().position(|h| h == target).ok_or_else(|| {
        TunerError::InvalidInput(format!("target column '{}' not found", target))
    })?;

    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != target_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut values = Vec::new();
    let mut raw_labels = Vec::new();
    let mut n_rows = 0;

    for (row_idx, record) in rdr.records().enumerate() {
        let record = record?;
        for (col_idx, field) in record.iter().enumerate() {
            if col_idx == target_idx {
                raw_labels.push(field.trim().to_string());
                continue;
            }
            let v: f64 = field.trim().parse().map_err(|_| {
                TunerError::InvalidInput(format!(
                    "row {}, column '{}': '{}' is not a number",
                    row_idx + 1,
                    &headers[col_idx],
                    field
                ))
            })?;
            values.push(v);
        }
        n_rows += 1;
    }

    let features = Array2::from_shape_vec((n_rows, feature_names.len()), values).map_err(|e| {
        TunerError::Shape {
            expected: format!("{} x {}", n_rows, feature_names.len()),
            actual: e.to_string(),
        }
    })?;

    Dataset::new(features, encode_labels(&raw_labels), feature_names)
}

fn encode_labels(raw: &[String]) -> Array1<f64> {
    let parsed: Option<Vec<f64>> = raw.iter().map(|s| s.parse().ok()).collect();
    if let Some(numeric) = parsed {
        return Array1::from_vec(numeric);
    }

    let mut names: Vec<&String> = raw.iter().collect();
    names.sort();
    names.dedup();
    info!(classes = ?names, "encoded string labels");
    raw.iter()
        .map(|s| names.iter().position(|n| *n == s).unwrap_or(0) as f64)
        .collect()
}

/// Stratified split: each class contributes `round(n_class * test_ratio)` rows to the test set.
pub fn train_test_split(dataset: &Dataset, test_ratio: f64, seed: u64) -> Result<DataSplit> {
    if !(0.0..1.0).contains(&test_ratio) {
        return Err(TunerError::InvalidInput(format!(
            "test ratio must be in [0, 1), got {}",
            test_ratio
        )));
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in dataset.labels().iter().enumerate() {
        by_class.entry(label.round() as i64).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for indices in by_class.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f64 * test_ratio).round() as usize;
        test_idx.extend_from_slice(&indices[..n_test]);
        train_idx.extend_from_slice(&indices[n_test..]);
    }

    train_idx.sort_unstable();
    test_idx.sort_unstable();

    DataSplit::new(dataset.select(&train_idx), dataset.select(&test_idx))
}
