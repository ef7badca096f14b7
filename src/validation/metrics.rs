use ndarray::Array1;
use serde::Serialize;

use crate::error::{Result, TunerError};

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TunerError::Shape {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TunerError::EmptyDataset("no labels to score".to_string()));
    }
    Ok(())
}

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Counts indexed `[true][predicted]` over the union of observed labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<f64>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let mut labels: Vec<f64> = y_true.iter().chain(y_pred.iter()).copied().collect();
        labels.sort_by(|a, b| a.total_cmp(b));
        labels.dedup();

        let index = |v: &f64| labels.partition_point(|c| c < v);
        let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            counts[index(t)][index(p)] += 1;
        }

        Ok(Self { labels, counts })
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    fn column_sum(&self, k: usize) -> usize {
        self.counts.iter().map(|row| row[k]).sum()
    }

    /// Per-label precision, recall, F1 and support. Undefined ratios are 0.
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        self.labels
            .iter()
            .enumerate()
            .map(|(k, &label)| {
                let tp = self.counts[k][k] as f64;
                let support: usize = self.counts[k].iter().sum();
                let predicted = self.column_sum(k);

                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);

                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 { num / den } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Unweighted mean over classes of precision, recall and F1.
pub fn macro_average(metrics: &[ClassMetrics]) -> (f64, f64, f64) {
    if metrics.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = metrics.len() as f64;
    let sum = |f: fn(&ClassMetrics) -> f64| metrics.iter().map(f).sum::<f64>() / n;
    (sum(|m| m.precision), sum(|m| m.recall), sum(|m| m.f1))
}

/// Area under the ROC curve for a binary problem.
///
/// Uses the rank-sum formulation with average ranks for tied scores.
/// Returns `None` when either class is absent.
pub fn roc_auc(positives: &[bool], scores: &[f64]) -> Option<f64> {
    if positives.len() != scores.len() {
        return None;
    }
    let n_pos = positives.iter().filter(|&&p| p).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; ties share the mean of their positions
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        rank_sum += order[start..end]
            .iter()
            .filter(|&&i| positives[i])
            .count() as f64
            * avg_rank;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
