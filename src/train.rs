use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::artifacts::{load_trial, save_model};
use crate::data::RunContext;
use crate::error::Result;
use crate::models::{Classifier, FittedModel, ModelFamily};
use crate::tuner::{ModelConfig, TrialRecord};

/// Fit `config` on the training split.
pub fn train_model(config: &ModelConfig, ctx: &RunContext) -> Result<FittedModel> {
    let started = Instant::now();
    let train = &ctx.split.train;

    let mut model = config.build(ctx);
    model.fit(train.features(), train.labels())?;

    info!(
        family = %config.family(),
        rows = train.n_samples(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "trained model"
    );
    Ok(model)
}

/// Typed knobs for `family`, taken from a persisted best trial when one is given.
pub fn config_for(family: ModelFamily, trial: Option<&TrialRecord>) -> Result<ModelConfig> {
    match trial {
        Some(trial) => ModelConfig::from_saved_params(family, &trial.params),
        None => Ok(ModelConfig::default_for(family)),
    }
}

/// Train `family` and write its model artifact to `output`.
///
/// With `trial_path`, the knobs come from that best-trial artifact, which must
/// belong to the same family and the same training data.
pub fn train_and_save(
    family: ModelFamily,
    ctx: &RunContext,
    trial_path: Option<&Path>,
    output: &Path,
) -> Result<FittedModel> {
    let trial = match trial_path {
        Some(path) => Some(load_trial(path, family, Some(&ctx.split.train))?.payload),
        None => None,
    };
    let config = config_for(family, trial.as_ref())?;
    let model = train_model(&config, ctx)?;
    save_model(output, &model, &config, &ctx.split.train)?;
    Ok(model)
}
