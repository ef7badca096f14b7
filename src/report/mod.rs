//! Reports over persisted models: feature importances against the training
//! features and evaluations against the test split.

mod evaluation;
mod importance;
mod render;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::artifacts::load_model;
use crate::data::RunContext;
use crate::error::{Result, TunerError};
use crate::models::{FittedModel, ModelFamily};

pub use evaluation::{evaluate, EvaluationReport};
pub use importance::{feature_importance, FeatureImportance, FeatureImportanceReport};
pub use render::{display_evaluation, display_importance};

/// Every persisted model, loaded up front.
#[derive(Debug)]
pub struct Deliverables {
    models: BTreeMap<ModelFamily, FittedModel>,
}

impl Deliverables {
    /// Default artifact locations for all three families under `dir`.
    pub fn default_paths(dir: &Path) -> Vec<(ModelFamily, PathBuf)> {
        ModelFamily::ALL
            .iter()
            .map(|f| (*f, dir.join(f.model_file())))
            .collect()
    }

    /// Load each artifact, checking it against the run's training data.
    ///
    /// Any failure aborts before a single report is produced.
    pub fn load(paths: &[(ModelFamily, PathBuf)], ctx: &RunContext) -> Result<Self> {
        let mut models = BTreeMap::new();
        for (family, path) in paths {
            let artifact = load_model(path, *family, Some(&ctx.split.train))?;
            info!(family = %family, path = %path.display(), "loaded model");
            models.insert(*family, artifact.payload);
        }
        Ok(Self { models })
    }

    pub fn model(&self, family: ModelFamily) -> Result<&FittedModel> {
        self.models.get(&family).ok_or_else(|| TunerError::UnknownFamily {
            label: family.label().to_string(),
            suggestion: None,
        })
    }

    pub fn families(&self) -> impl Iterator<Item = ModelFamily> + '_ {
        self.models.keys().copied()
    }

    pub fn importance(&self, family: ModelFamily, ctx: &RunContext) -> Result<FeatureImportanceReport> {
        feature_importance(self.model(family)?, &ctx.split.train)
    }

    pub fn evaluation(&self, family: ModelFamily, ctx: &RunContext) -> Result<EvaluationReport> {
        evaluate(self.model(family)?, &ctx.split.test)
    }

    /// Print importance reports, then evaluation reports, for the requested families.
    pub fn run(
        &self,
        ctx: &RunContext,
        importance_families: &[ModelFamily],
        evaluate_families: &[ModelFamily],
    ) -> Result<()> {
        for family in importance_families {
            display_importance(&self.importance(*family, ctx)?);
        }
        for family in evaluate_families {
            display_evaluation(&self.evaluation(*family, ctx)?);
        }
        Ok(())
    }
}
