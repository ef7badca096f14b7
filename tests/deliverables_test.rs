use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2};
use tempfile::tempdir;

use classifier_tuner_rs::data::{DataSplit, Dataset, RunContext};
use classifier_tuner_rs::models::ModelFamily;
use classifier_tuner_rs::report::{evaluate, Deliverables};
use classifier_tuner_rs::train::train_and_save;
use classifier_tuner_rs::TunerError;

fn dataset(n: usize) -> Dataset {
    let x = Array2::from_shape_fn((n, 3), |(i, j)| {
        let class = (i % 2) as f64;
        class * 3.0 + ((i * 5 + j * 3) % 7) as f64 * 0.1
    });
    let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    Dataset::new(x, y, vec!["alpha".into(), "beta".into(), "gamma".into()]).unwrap()
}

fn context() -> RunContext {
    RunContext::new(DataSplit::new(dataset(40), dataset(12)).unwrap())
}

fn train_all(ctx: &RunContext, dir: &Path) {
    for family in ModelFamily::ALL {
        train_and_save(family, ctx, None, &dir.join(family.model_file())).unwrap();
    }
}

#[test]
fn test_reports_for_all_families() {
    let ctx = context();
    let dir = tempdir().unwrap();
    train_all(&ctx, dir.path());

    let deliverables = Deliverables::load(&Deliverables::default_paths(dir.path()), &ctx).unwrap();
    assert_eq!(deliverables.families().count(), 3);

    let importance = deliverables.importance(ModelFamily::GradientBoosting, &ctx).unwrap();
    assert_eq!(importance.features.len(), 3);
    assert!(importance
        .features
        .windows(2)
        .all(|w| w[0].importance >= w[1].importance));

    let evaluation = deliverables.evaluation(ModelFamily::RandomForest, &ctx).unwrap();
    assert_eq!(evaluation.n_samples, 12);
    assert_eq!(evaluation.accuracy, 1.0);
    assert_eq!(evaluation.confusion.total(), 12);

    deliverables
        .run(
            &ctx,
            &[ModelFamily::RandomForest, ModelFamily::GradientBoosting],
            &[ModelFamily::RandomForest, ModelFamily::GradientBoosting],
        )
        .unwrap();
}

#[test]
fn test_corrupt_artifact_aborts_loading() {
    let ctx = context();
    let dir = tempdir().unwrap();
    train_all(&ctx, dir.path());

    fs::write(dir.path().join("xgb_model.json"), "{\"not\": \"a model\"}").unwrap();

    let result = Deliverables::load(&Deliverables::default_paths(dir.path()), &ctx);
    assert!(matches!(result, Err(TunerError::IncompatibleArtifact { .. })));
}

#[test]
fn test_swapped_artifact_aborts_loading() {
    let ctx = context();
    let dir = tempdir().unwrap();
    train_all(&ctx, dir.path());

    fs::copy(dir.path().join("rf_model.json"), dir.path().join("lgr_model.json")).unwrap();

    let result = Deliverables::load(&Deliverables::default_paths(dir.path()), &ctx);
    assert!(matches!(result, Err(TunerError::IncompatibleArtifact { .. })));
}

#[test]
fn test_missing_artifact_aborts_loading() {
    let ctx = context();
    let dir = tempdir().unwrap();
    train_and_save(
        ModelFamily::RandomForest,
        &ctx,
        None,
        &dir.path().join("rf_model.json"),
    )
    .unwrap();

    let result = Deliverables::load(&Deliverables::default_paths(dir.path()), &ctx);
    assert!(matches!(result, Err(TunerError::Io(_))));
}

#[test]
fn test_artifact_from_other_data_is_rejected() {
    let ctx = context();
    let dir = tempdir().unwrap();
    train_all(&ctx, dir.path());

    let other = RunContext::new(DataSplit::new(dataset(44), dataset(12)).unwrap());
    let result = Deliverables::load(&Deliverables::default_paths(dir.path()), &other);
    assert!(matches!(result, Err(TunerError::IncompatibleArtifact { .. })));
}

#[test]
fn test_empty_test_split_is_an_error() {
    let ctx = context();
    let dir = tempdir().unwrap();
    let model = train_and_save(
        ModelFamily::RandomForest,
        &ctx,
        None,
        &dir.path().join("rf_model.json"),
    )
    .unwrap();

    let empty = Dataset::new(
        Array2::zeros((0, 3)),
        Array1::zeros(0),
        vec!["alpha".into(), "beta".into(), "gamma".into()],
    )
    .unwrap();

    assert!(matches!(evaluate(&model, &empty), Err(TunerError::EmptyDataset(_))));
}
