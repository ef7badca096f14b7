use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::boosting::GradientBoosting;
use super::classifier::Classifier;
use super::family::ModelFamily;
use super::forest::RandomForest;
use super::logistic::LogisticRegression;
use crate::error::Result;

/// Any estimator this crate persists, tagged by family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", content = "model")]
pub enum FittedModel {
    #[serde(rename = "RF")]
    RandomForest(RandomForest),
    #[serde(rename = "LGR")]
    LogisticRegression(LogisticRegression),
    #[serde(rename = "XGB")]
    GradientBoosting(GradientBoosting),
}

impl FittedModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            FittedModel::RandomForest(_) => ModelFamily::RandomForest,
            FittedModel::LogisticRegression(_) => ModelFamily::LogisticRegression,
            FittedModel::GradientBoosting(_) => ModelFamily::GradientBoosting,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            FittedModel::RandomForest(m) => m,
            FittedModel::LogisticRegression(m) => m,
            FittedModel::GradientBoosting(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            FittedModel::RandomForest(m) => m,
            FittedModel::LogisticRegression(m) => m,
            FittedModel::GradientBoosting(m) => m,
        }
    }
}

impl Classifier for FittedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().predict_proba(x)
    }

    fn classes(&self) -> &[f64] {
        self.inner().classes()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.inner().feature_importances()
    }
}
