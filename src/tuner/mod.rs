pub mod diagnostics;
pub mod evaluation;
pub mod knobs;
pub mod output;
pub mod search;
pub mod space;
pub mod study;

pub use diagnostics::Diagnostics;
pub use evaluation::evaluate_config;
pub use knobs::{
    contour_params, default_space, BoostingParams, LogisticParams, ModelConfig,
    RandomForestParams,
};
pub use output::{print_summary, print_topk, write_csv};
pub use search::{run_tuner, TunerConfig, TunerResults};
pub use space::{format_params, Domain, ParamSet, ParamValue, SearchSpace};
pub use study::{
    FailurePolicy, RandomSampler, Sampler, Study, TrialOutcome, TrialRecord, TrialState,
};
