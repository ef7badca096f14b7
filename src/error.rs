use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid search space: {0}")]
    InvalidSpace(String),

    #[error("Parameter {name} out of domain: {reason}")]
    OutOfDomain { name: String, reason: String },

    #[error("Unknown model family '{label}'{}", did_you_mean(.suggestion))]
    UnknownFamily {
        label: String,
        suggestion: Option<String>,
    },

    #[error("Model is not fitted")]
    ModelNotFitted,

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Incompatible artifact {path}: {reason}")]
    IncompatibleArtifact { path: String, reason: String },

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("No trial completed out of {0}")]
    NoCompletedTrials(usize),
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{}'?)", s),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, TunerError>;
