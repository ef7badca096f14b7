use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::artifacts::format::{Artifact, ArtifactHeader, ArtifactKind};
use crate::constants::{ARTIFACT_FORMAT, ARTIFACT_VERSION};
use crate::data::Dataset;
use crate::error::{Result, TunerError};
use crate::models::{FittedModel, ModelFamily};
use crate::tuner::{ModelConfig, TrialRecord};

fn incompatible(path: &Path, reason: String) -> TunerError {
    TunerError::IncompatibleArtifact {
        path: path.display().to_string(),
        reason,
    }
}

fn write_artifact<T: Serialize, P: AsRef<Path>>(path: P, artifact: &Artifact<T>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(artifact)?;
    fs::write(path, json)?;
    info!(
        path = %path.display(),
        kind = ?artifact.header.kind,
        family = %artifact.header.family,
        "saved artifact"
    );
    Ok(())
}

/// Read an envelope and check its header before touching the payload.
fn read_artifact<T: DeserializeOwned>(
    path: &Path,
    kind: ArtifactKind,
    family: ModelFamily,
    train: Option<&Dataset>,
) -> Result<Artifact<T>> {
    let content = fs::read_to_string(path)?;
    let raw: Artifact<serde_json::Value> =
        serde_json::from_str(&content).map_err(|e| incompatible(path, format!("malformed: {}", e)))?;
    let header = raw.header;

    if header.format != ARTIFACT_FORMAT {
        return Err(incompatible(path, format!("unknown format '{}'", header.format)));
    }
    if header.format_version != ARTIFACT_VERSION {
        return Err(incompatible(
            path,
            format!(
                "format version {} is not supported (expected {})",
                header.format_version, ARTIFACT_VERSION
            ),
        ));
    }
    if header.kind != kind {
        return Err(incompatible(
            path,
            format!("holds a {:?} artifact, expected {:?}", header.kind, kind),
        ));
    }
    if header.family != family {
        return Err(incompatible(
            path,
            format!("holds a {} artifact, expected {}", header.family, family),
        ));
    }
    if let Some(train) = train {
        if header.training_fingerprint != train.fingerprint() {
            return Err(incompatible(
                path,
                "was produced from different training data".to_string(),
            ));
        }
    }

    let payload = serde_json::from_value(raw.payload)
        .map_err(|e| incompatible(path, format!("bad payload: {}", e)))?;
    debug!(path = %path.display(), "loaded artifact");
    Ok(Artifact { header, payload })
}

/// Persist a fitted model with the knobs and training data it came from.
pub fn save_model<P: AsRef<Path>>(
    path: P,
    model: &FittedModel,
    config: &ModelConfig,
    train: &Dataset,
) -> Result<()> {
    if model.family() != config.family() {
        return Err(TunerError::InvalidInput(format!(
            "model is {} but its configuration is {}",
            model.family(),
            config.family()
        )));
    }
    let header = ArtifactHeader::new(ArtifactKind::Model, model.family(), config.to_params(), train);
    write_artifact(
        path,
        &Artifact {
            header,
            payload: model,
        },
    )
}

/// Load a model artifact of `family`.
///
/// When `train` is given, the artifact must have been produced from exactly
/// that training data.
pub fn load_model<P: AsRef<Path>>(
    path: P,
    family: ModelFamily,
    train: Option<&Dataset>,
) -> Result<Artifact<FittedModel>> {
    let path = path.as_ref();
    let artifact: Artifact<FittedModel> = read_artifact(path, ArtifactKind::Model, family, train)?;

    if artifact.payload.family() != family {
        return Err(incompatible(
            path,
            format!("payload is a {} model", artifact.payload.family()),
        ));
    }
    if let Some(train) = train {
        if artifact.header.feature_names != train.feature_names() {
            return Err(incompatible(path, "feature columns differ".to_string()));
        }
    }
    Ok(artifact)
}

/// Persist the best trial of a study.
pub fn save_trial<P: AsRef<Path>>(
    path: P,
    family: ModelFamily,
    trial: &TrialRecord,
    train: &Dataset,
) -> Result<()> {
    let header = ArtifactHeader::new(ArtifactKind::Trial, family, trial.params.clone(), train);
    write_artifact(
        path,
        &Artifact {
            header,
            payload: trial,
        },
    )
}

pub fn load_trial<P: AsRef<Path>>(
    path: P,
    family: ModelFamily,
    train: Option<&Dataset>,
) -> Result<Artifact<TrialRecord>> {
    read_artifact(path.as_ref(), ArtifactKind::Trial, family, train)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classifier, MaxFeatures, RandomForest};
    use crate::tuner::{ParamSet, ParamValue, RandomForestParams, TrialState};
    use ndarray::{array, Array1, Array2};
    use tempfile::tempdir;

    fn train() -> Dataset {
        Dataset::unnamed(
            array![[0.0, 1.0], [1.0, 0.0], [4.0, 5.0], [5.0, 4.0]],
            array![0.0, 0.0, 1.0, 1.0],
        )
        .unwrap()
    }

    fn fitted() -> (FittedModel, ModelConfig) {
        let mut model = FittedModel::RandomForest(RandomForest::new(5));
        model.fit(train().features(), train().labels()).unwrap();
        let config = ModelConfig::RandomForest(RandomForestParams {
            n_estimators: 5,
            ..Default::default()
        });
        (model, config)
    }

    #[test]
    fn test_model_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rf_model.json");
        let (model, config) = fitted();

        save_model(&path, &model, &config, &train()).unwrap();
        let loaded = load_model(&path, ModelFamily::RandomForest, Some(&train())).unwrap();

        assert_eq!(loaded.header.n_features, 2);
        assert_eq!(
            loaded.payload.predict(train().features()).unwrap(),
            model.predict(train().features()).unwrap()
        );
    }

    #[test]
    fn test_unbounded_depth_forest_reloads() {
        let n = 400;
        let data = Dataset::unnamed(
            Array2::from_shape_fn((n, 1), |(i, _)| i as f64),
            Array1::from_shape_fn(n, |i| ((i * i / 7) % 2) as f64),
        )
        .unwrap();
        let mut model = FittedModel::RandomForest(
            RandomForest::new(3)
                .with_max_depth(None)
                .with_max_features(MaxFeatures::All)
                .with_bootstrap(false),
        );
        model.fit(data.features(), data.labels()).unwrap();
        let config = ModelConfig::RandomForest(RandomForestParams {
            n_estimators: 3,
            max_depth: None,
            max_features: MaxFeatures::All,
            bootstrap: false,
            ..Default::default()
        });

        let dir = tempdir().unwrap();
        let path = dir.path().join("rf_model.json");
        save_model(&path, &model, &config, &data).unwrap();
        let loaded = load_model(&path, ModelFamily::RandomForest, Some(&data)).unwrap();

        assert_eq!(
            loaded.payload.predict(data.features()).unwrap(),
            model.predict(data.features()).unwrap()
        );
    }

    #[test]
    fn test_rejects_wrong_family() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rf_model.json");
        let (model, config) = fitted();
        save_model(&path, &model, &config, &train()).unwrap();

        let err = load_model(&path, ModelFamily::GradientBoosting, None).unwrap_err();
        assert!(matches!(err, TunerError::IncompatibleArtifact { .. }));
    }

    #[test]
    fn test_rejects_other_training_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rf_model.json");
        let (model, config) = fitted();
        save_model(&path, &model, &config, &train()).unwrap();

        let other = Dataset::unnamed(array![[9.0, 9.0], [8.0, 8.0]], Array1::from(vec![0.0, 1.0])).unwrap();
        assert!(matches!(
            load_model(&path, ModelFamily::RandomForest, Some(&other)),
            Err(TunerError::IncompatibleArtifact { .. })
        ));
    }

    #[test]
    fn test_rejects_corrupt_and_versioned_files() {
        let dir = tempdir().unwrap();

        let corrupt = dir.path().join("corrupt.json");
        fs::write(&corrupt, b"\x80\x04not json").unwrap();
        assert!(load_model(&corrupt, ModelFamily::RandomForest, None).is_err());

        let path = dir.path().join("rf_model.json");
        let (model, config) = fitted();
        save_model(&path, &model, &config, &train()).unwrap();
        let bumped = fs::read_to_string(&path)
            .unwrap()
            .replacen("\"format_version\": 1", "\"format_version\": 99", 1);
        fs::write(&path, bumped).unwrap();

        let err = load_model(&path, ModelFamily::RandomForest, None).unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn test_trial_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rf_trial.json");
        let mut params = ParamSet::new();
        params.insert("n_estimators".into(), ParamValue::Int(77));
        let trial = TrialRecord {
            number: 3,
            params,
            state: TrialState::Complete,
            value: Some(0.9),
            fold_scores: vec![0.9; 5],
            train_accuracy: Some(1.0),
            error: None,
        };

        save_trial(&path, ModelFamily::RandomForest, &trial, &train()).unwrap();
        let loaded = load_trial(&path, ModelFamily::RandomForest, None).unwrap();
        assert_eq!(loaded.payload, trial);

        assert!(load_model(&path, ModelFamily::RandomForest, None).is_err());
    }
}
