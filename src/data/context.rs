use crate::constants::DEFAULT_MODEL_SEED;
use crate::data::dataset::DataSplit;

/// Everything a single run shares: the data split plus model construction settings.
///
/// Built once by the binary and passed by reference to every component.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub split: DataSplit,
    /// Seed handed to every model constructor.
    pub model_seed: u64,
    /// Worker threads for model fitting; `None` uses every available core.
    pub n_jobs: Option<usize>,
}

impl RunContext {
    pub fn new(split: DataSplit) -> Self {
        Self {
            split,
            model_seed: DEFAULT_MODEL_SEED,
            n_jobs: None,
        }
    }

    pub fn with_model_seed(mut self, seed: u64) -> Self {
        self.model_seed = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }
}
