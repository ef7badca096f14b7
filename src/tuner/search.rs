use tracing::info;

use crate::constants::{DEFAULT_CV_FOLDS, DEFAULT_SAMPLER_SEED, DEFAULT_TRIALS};
use crate::data::RunContext;
use crate::error::{Result, TunerError};
use crate::models::ModelFamily;
use crate::tuner::evaluation::evaluate_config;
use crate::tuner::knobs::{default_space, ModelConfig};
use crate::tuner::space::SearchSpace;
use crate::tuner::study::{FailurePolicy, RandomSampler, Study, TrialRecord};

/// Configuration for the tuner.
#[derive(Debug, Clone)]
pub struct TunerConfig {
    pub family: ModelFamily,
    /// Exact number of trials to run.
    pub n_trials: usize,
    pub cv_folds: usize,
    pub sampler_seed: u64,
    pub space: SearchSpace,
    pub failure_policy: FailurePolicy,
}

impl TunerConfig {
    /// Defaults for `family` with its default search space.
    pub fn new(family: ModelFamily) -> Result<Self> {
        Ok(Self {
            family,
            n_trials: DEFAULT_TRIALS,
            cv_folds: DEFAULT_CV_FOLDS,
            sampler_seed: DEFAULT_SAMPLER_SEED,
            space: default_space(family)?,
            failure_policy: FailurePolicy::default(),
        })
    }
}

/// Results from a tuning run.
#[derive(Debug, Clone)]
pub struct TunerResults {
    pub family: ModelFamily,
    pub study: Study,
    /// The best completed trial.
    pub best: TrialRecord,
    /// Typed knobs of the best trial.
    pub best_config: ModelConfig,
}

impl TunerResults {
    pub fn best_value(&self) -> f64 {
        self.best.value.unwrap_or(f64::NAN)
    }
}

/// Run random-search tuning for one model family.
pub fn run_tuner(config: &TunerConfig, ctx: &RunContext) -> Result<TunerResults> {
    if config.n_trials == 0 {
        return Err(TunerError::InvalidInput("n_trials must be positive".to_string()));
    }
    if ctx.split.train.is_empty() {
        return Err(TunerError::EmptyDataset("training split".to_string()));
    }

    info!(
        family = %config.family,
        trials = config.n_trials,
        folds = config.cv_folds,
        train_rows = ctx.split.train.n_samples(),
        test_rows = ctx.split.test.n_samples(),
        "starting study"
    );
    println!(
        "Tuning {} over {} trials ({}-fold CV)...",
        config.family.display_name(),
        config.n_trials,
        config.cv_folds
    );

    let mut study = Study::new();
    let mut sampler = RandomSampler::new(config.sampler_seed);
    study.optimize(
        &config.space,
        &mut sampler,
        config.n_trials,
        config.failure_policy,
        |params| {
            let model_config = ModelConfig::from_params(config.family, params, &config.space)?;
            evaluate_config(&model_config, ctx, config.cv_folds)
        },
    )?;

    let best = study
        .best_trial()
        .cloned()
        .ok_or(TunerError::NoCompletedTrials(study.trials().len()))?;
    let best_config = ModelConfig::from_params(config.family, &best.params, &config.space)?;

    info!(
        trial = best.number,
        value = best.value,
        completed = study.completed().count(),
        "study finished"
    );

    Ok(TunerResults {
        family: config.family,
        study,
        best,
        best_config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSplit, Dataset};
    use crate::tuner::space::Domain;
    use ndarray::{Array1, Array2};

    fn context() -> RunContext {
        let make = |n: usize| {
            let x = Array2::from_shape_fn((n, 2), |(i, j)| (i % 2) as f64 * 3.0 + ((i * 7 + j) % 5) as f64 * 0.2);
            let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
            Dataset::unnamed(x, y).unwrap()
        };
        RunContext::new(DataSplit::new(make(40), make(20)).unwrap())
    }

    fn small_config(family: ModelFamily, n_trials: usize) -> TunerConfig {
        let mut config = TunerConfig::new(family).unwrap();
        config.n_trials = n_trials;
        config.space = config
            .space
            .with_domain("n_estimators", Domain::int(5, 15))
            .unwrap();
        config
    }

    #[test]
    fn test_runs_exact_budget() {
        let results = run_tuner(&small_config(ModelFamily::RandomForest, 4), &context()).unwrap();
        assert_eq!(results.study.trials().len(), 4);
        assert_eq!(results.family, ModelFamily::RandomForest);
    }

    #[test]
    fn test_best_is_max() {
        let results = run_tuner(&small_config(ModelFamily::GradientBoosting, 3), &context()).unwrap();
        let max = results
            .study
            .trials()
            .iter()
            .filter_map(|t| t.value)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(results.best_value(), max);
    }

    #[test]
    fn test_zero_trials_rejected() {
        let mut config = small_config(ModelFamily::RandomForest, 1);
        config.n_trials = 0;
        assert!(run_tuner(&config, &context()).is_err());
    }
}
