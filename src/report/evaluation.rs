use serde::Serialize;

use crate::data::Dataset;
use crate::error::{Result, TunerError};
use crate::models::{Classifier, FittedModel, ModelFamily};
use crate::validation::{accuracy, macro_average, roc_auc, ClassMetrics, ConfusionMatrix};

/// Held-out performance of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub family: ModelFamily,
    pub n_samples: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub classes: Vec<ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    /// Only for two-class models with both classes present in `test`.
    pub roc_auc: Option<f64>,
}

/// Score `model` on `test`. An empty test split is an error.
pub fn evaluate(model: &FittedModel, test: &Dataset) -> Result<EvaluationReport> {
    if test.is_empty() {
        return Err(TunerError::EmptyDataset(format!(
            "no test rows to evaluate {}",
            model.family()
        )));
    }

    let predicted = model.predict(test.features())?;
    let confusion = ConfusionMatrix::new(test.labels(), &predicted)?;
    let classes = confusion.class_metrics();
    let (macro_precision, macro_recall, macro_f1) = macro_average(&classes);

    let roc_auc = match model.classes() {
        [_, positive] => {
            let proba = model.predict_proba(test.features())?;
            let positives: Vec<bool> = test.labels().iter().map(|y| y == positive).collect();
            let scores: Vec<f64> = proba.column(1).to_vec();
            roc_auc(&positives, &scores)
        }
        _ => None,
    };

    Ok(EvaluationReport {
        family: model.family(),
        n_samples: test.n_samples(),
        accuracy: accuracy(test.labels(), &predicted)?,
        confusion,
        classes,
        macro_precision,
        macro_recall,
        macro_f1,
        roc_auc,
    })
}
