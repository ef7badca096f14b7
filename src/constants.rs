/// Trials run by a tuning study unless overridden.
pub const DEFAULT_TRIALS: usize = 100;

/// Folds used by `cross_val_score` during tuning.
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Seed handed to every model constructor.
pub const DEFAULT_MODEL_SEED: u64 = 42;

/// Seed for the hyperparameter sampler.
pub const DEFAULT_SAMPLER_SEED: u64 = 123;

/// Fraction of rows held out as the test split.
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Seed for the train/test split.
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Default dataset location and label column.
pub const DEFAULT_DATA_PATH: &str = "data.csv";
pub const DEFAULT_TARGET: &str = "target";

// ─────────────────────────────────────────────────────────────────────────────
// Artifact file names
// ─────────────────────────────────────────────────────────────────────────────

pub const RF_MODEL_FILE: &str = "rf_model.json";
pub const LGR_MODEL_FILE: &str = "lgr_model.json";
pub const XGB_MODEL_FILE: &str = "xgb_model.json";

/// Magic string written into every artifact header.
pub const ARTIFACT_FORMAT: &str = "classifier-tuner";

/// Current artifact schema version. Bump on any incompatible payload change.
pub const ARTIFACT_VERSION: u32 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// Bins used when bucketing numeric parameters for contours and importances.
pub const DIAGNOSTIC_BINS: usize = 5;

/// Width of the text bar charts in reports.
pub const BAR_WIDTH: usize = 40;

/// Parameters plotted pairwise for random forest studies.
pub const RF_CONTOUR_PARAMS: [&str; 5] = [
    "n_estimators",
    "max_depth",
    "min_samples_split",
    "min_samples_leaf",
    "max_features",
];
