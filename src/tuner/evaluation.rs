use std::time::Instant;

use tracing::debug;

use crate::data::RunContext;
use crate::error::Result;
use crate::models::Classifier;
use crate::tuner::knobs::ModelConfig;
use crate::tuner::study::TrialOutcome;
use crate::validation::{accuracy, cross_val_score, StratifiedKFold};

/// Score one configuration.
///
/// The model is fit on the training split and its training accuracy recorded;
/// the objective is the mean accuracy of `cv_folds`-fold stratified
/// cross-validation over the test split, refitting a fresh clone per fold.
pub fn evaluate_config(config: &ModelConfig, ctx: &RunContext, cv_folds: usize) -> Result<TrialOutcome> {
    let started = Instant::now();
    let train = &ctx.split.train;
    let test = &ctx.split.test;

    let mut model = config.build(ctx);
    model.fit(train.features(), train.labels())?;
    let train_accuracy = accuracy(train.labels(), &model.predict(train.features())?)?;

    let fold_scores = cross_val_score(&model, test, &StratifiedKFold::new(cv_folds))?;
    let value = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;

    debug!(
        family = %config.family(),
        train_accuracy,
        value,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "evaluated configuration"
    );

    Ok(TrialOutcome {
        value,
        fold_scores,
        train_accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSplit, Dataset};
    use crate::models::ModelFamily;
    use crate::tuner::knobs::RandomForestParams;
    use ndarray::{Array1, Array2};

    fn context() -> RunContext {
        let make = |n: usize, offset: f64| {
            let x = Array2::from_shape_fn((n, 3), |(i, j)| {
                let class = (i % 2) as f64;
                class * 4.0 + offset + (i as f64 * 0.37 + j as f64).sin()
            });
            let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
            Dataset::unnamed(x, y).unwrap()
        };
        RunContext::new(DataSplit::new(make(60, 0.0), make(30, 0.1)).unwrap()).with_n_jobs(Some(2))
    }

    #[test]
    fn test_evaluate_forest() {
        let config = ModelConfig::RandomForest(RandomForestParams {
            n_estimators: 10,
            ..Default::default()
        });
        let outcome = evaluate_config(&config, &context(), 5).unwrap();

        assert_eq!(outcome.fold_scores.len(), 5);
        assert!(outcome.value > 0.8);
        assert!(outcome.train_accuracy > 0.9);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let ctx = context();
        let config = ModelConfig::default_for(ModelFamily::GradientBoosting);
        let a = evaluate_config(&config, &ctx, 3).unwrap();
        let b = evaluate_config(&config, &ctx, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_too_many_folds_fails() {
        let config = ModelConfig::default_for(ModelFamily::LogisticRegression);
        assert!(evaluate_config(&config, &context(), 40).is_err());
    }
}
