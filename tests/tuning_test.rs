use std::io::Write;

use ndarray::{Array1, Array2};
use tempfile::NamedTempFile;

use classifier_tuner_rs::data::{CsvProvider, DataProvider, DataSplit, Dataset, RunContext};
use classifier_tuner_rs::models::{Classifier, ModelFamily};
use classifier_tuner_rs::tuner::{
    run_tuner, Domain, FailurePolicy, ModelConfig, ParamValue, SearchSpace, TunerConfig,
};
use classifier_tuner_rs::TunerError;

/// Two noisy, mostly separable classes.
fn dataset(n: usize, phase: f64) -> Dataset {
    let x = Array2::from_shape_fn((n, 4), |(i, j)| {
        let class = (i % 2) as f64;
        let wobble = ((i as f64 + phase) * 1.7 + j as f64 * 0.9).sin();
        match j {
            0 => class * 2.0 + wobble,
            1 => class - 0.5 * wobble,
            _ => wobble,
        }
    });
    let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    Dataset::unnamed(x, y).unwrap()
}

fn context() -> RunContext {
    let split = DataSplit::new(dataset(100, 0.0), dataset(30, 0.3)).unwrap();
    RunContext::new(split).with_n_jobs(Some(2))
}

fn n_estimators_space() -> SearchSpace {
    SearchSpace::new(vec![("n_estimators".into(), Domain::int(50, 300))]).unwrap()
}

#[test]
fn test_forest_study_runs_budget_and_returns_best_in_range() {
    let mut config = TunerConfig::new(ModelFamily::RandomForest).unwrap();
    config.n_trials = 5;
    config.space = n_estimators_space();

    let results = run_tuner(&config, &context()).unwrap();

    assert_eq!(results.study.trials().len(), 5);
    assert_eq!(results.study.completed().count(), 5);
    match results.best.params.get("n_estimators") {
        Some(ParamValue::Int(n)) => assert!((50..=300).contains(n)),
        other => panic!("n_estimators missing or not an integer: {:?}", other),
    }
}

#[test]
fn test_best_trial_has_max_mean_score() {
    let mut config = TunerConfig::new(ModelFamily::LogisticRegression).unwrap();
    config.n_trials = 6;

    let results = run_tuner(&config, &context()).unwrap();

    for trial in results.study.trials() {
        assert!(trial.value <= results.best.value);
        let mean = trial.fold_scores.iter().sum::<f64>() / trial.fold_scores.len() as f64;
        assert_eq!(trial.value, Some(mean));
    }
    assert_eq!(results.study.best_trial(), Some(&results.best));
}

#[test]
fn test_study_is_reproducible() {
    let mut config = TunerConfig::new(ModelFamily::GradientBoosting).unwrap();
    config.n_trials = 3;
    config.space = config
        .space
        .with_domain("n_estimators", Domain::int(10, 30))
        .unwrap();

    let a = run_tuner(&config, &context()).unwrap();
    let b = run_tuner(&config, &context().with_n_jobs(Some(1))).unwrap();

    assert_eq!(a.best, b.best);
    assert_eq!(a.study.trials(), b.study.trials());
}

#[test]
fn test_same_config_same_predictions() {
    let ctx = context();
    let config = ModelConfig::default_for(ModelFamily::RandomForest);

    let mut first = config.build(&ctx);
    let mut second = config.build(&ctx);
    first.fit(ctx.split.train.features(), ctx.split.train.labels()).unwrap();
    second.fit(ctx.split.train.features(), ctx.split.train.labels()).unwrap();

    assert_eq!(
        first.predict_proba(ctx.split.test.features()).unwrap(),
        second.predict_proba(ctx.split.test.features()).unwrap()
    );
}

fn half_invalid_space() -> SearchSpace {
    // min_samples_split below 2 cannot be built
    SearchSpace::new(vec![
        ("n_estimators".into(), Domain::int(5, 10)),
        ("min_samples_split".into(), Domain::int(0, 3)),
    ])
    .unwrap()
}

#[test]
fn test_skip_policy_keeps_budget() {
    let mut config = TunerConfig::new(ModelFamily::RandomForest).unwrap();
    config.n_trials = 12;
    config.space = half_invalid_space();
    config.failure_policy = FailurePolicy::Skip;

    let results = run_tuner(&config, &context()).unwrap();

    let trials = results.study.trials();
    let failed = trials.iter().filter(|t| !t.is_complete()).count();
    assert_eq!(trials.len(), 12);
    assert!(failed > 0);
    assert!(results.best.is_complete());
    assert!(trials.iter().filter(|t| !t.is_complete()).all(|t| t.error.is_some()));
}

#[test]
fn test_abort_policy_stops_on_failure() {
    let mut config = TunerConfig::new(ModelFamily::RandomForest).unwrap();
    config.n_trials = 12;
    config.space = half_invalid_space();

    let err = run_tuner(&config, &context()).unwrap_err();
    assert!(matches!(err, TunerError::OutOfDomain { .. }));
}

#[test]
fn test_study_from_csv_provider() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "length,width,species").unwrap();
    for i in 0..60 {
        let species = if i % 3 == 0 { "setosa" } else { "versicolor" };
        let base = if i % 3 == 0 { 1.0 } else { 4.0 };
        writeln!(file, "{},{},{}", base + (i % 7) as f64 * 0.1, base * 0.5, species).unwrap();
    }
    file.flush().unwrap();

    let split = CsvProvider::new(file.path(), "species")
        .with_test_ratio(0.5)
        .load()
        .unwrap();
    assert_eq!(split.train.n_samples() + split.test.n_samples(), 60);

    let mut config = TunerConfig::new(ModelFamily::RandomForest).unwrap();
    config.n_trials = 2;
    config.space = SearchSpace::new(vec![("n_estimators".into(), Domain::int(5, 20))]).unwrap();

    let results = run_tuner(&config, &RunContext::new(split)).unwrap();
    assert_eq!(results.best_value(), 1.0);
}
