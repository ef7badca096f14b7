use serde::{Deserialize, Serialize};

use crate::constants::{ARTIFACT_FORMAT, ARTIFACT_VERSION};
use crate::data::Dataset;
use crate::models::ModelFamily;
use crate::tuner::ParamSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Model,
    Trial,
}

/// Metadata stored ahead of every persisted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    /// Always [`ARTIFACT_FORMAT`].
    pub format: String,
    pub format_version: u32,
    pub kind: ArtifactKind,
    pub family: ModelFamily,
    pub params: ParamSet,
    /// SHA-256 of the training split the payload was produced from.
    pub training_fingerprint: String,
    pub n_features: usize,
    pub feature_names: Vec<String>,
}

impl ArtifactHeader {
    pub fn new(kind: ArtifactKind, family: ModelFamily, params: ParamSet, train: &Dataset) -> Self {
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            format_version: ARTIFACT_VERSION,
            kind,
            family,
            params,
            training_fingerprint: train.fingerprint(),
            n_features: train.n_features(),
            feature_names: train.feature_names().to_vec(),
        }
    }
}

/// A versioned JSON envelope around a model or trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub header: ArtifactHeader,
    pub payload: T,
}
