mod format;
mod persistence;

pub use format::{Artifact, ArtifactHeader, ArtifactKind};
pub use persistence::{load_model, load_trial, save_model, save_trial};
