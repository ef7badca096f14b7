use serde::Serialize;

use crate::data::Dataset;
use crate::error::{Result, TunerError};
use crate::models::{Classifier, FittedModel, ModelFamily};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Normalized importances of one model, highest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportanceReport {
    pub family: ModelFamily,
    pub features: Vec<FeatureImportance>,
}

/// Pair a model's importances with the column names of `features`.
pub fn feature_importance(model: &FittedModel, features: &Dataset) -> Result<FeatureImportanceReport> {
    let importances = model.feature_importances().ok_or(TunerError::ModelNotFitted)?;
    if importances.len() != features.n_features() {
        return Err(TunerError::Shape {
            expected: format!("{} features", importances.len()),
            actual: format!("{} features", features.n_features()),
        });
    }

    let mut rows: Vec<FeatureImportance> = features
        .feature_names()
        .iter()
        .zip(importances.iter())
        .map(|(name, &importance)| FeatureImportance {
            feature: name.clone(),
            importance,
        })
        .collect();
    // stable sort keeps column order among ties
    rows.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    Ok(FeatureImportanceReport {
        family: model.family(),
        features: rows,
    })
}
