use crate::constants::BAR_WIDTH;
use crate::report::evaluation::EvaluationReport;
use crate::report::importance::FeatureImportanceReport;

/// Display feature importances as a bar chart.
pub fn display_importance(report: &FeatureImportanceReport) {
    println!();
    println!(
        "=== Feature Importance: {} ({}) ===",
        report.family.display_name(),
        report.family
    );
    println!();

    if report.features.is_empty() {
        println!("No features.");
        return;
    }

    let max_name_len = report
        .features
        .iter()
        .map(|f| f.feature.len())
        .max()
        .unwrap_or(10);
    let max_importance = report
        .features
        .iter()
        .map(|f| f.importance)
        .fold(0.0_f64, f64::max);

    for (i, f) in report.features.iter().enumerate() {
        let scaled = if max_importance > 0.0 {
            f.importance / max_importance
        } else {
            0.0
        };
        let bar = "█".repeat((scaled * BAR_WIDTH as f64).round() as usize);
        println!(
            "{:>3}. {:<width$}  {:.4}  {}",
            i + 1,
            f.feature,
            f.importance,
            bar,
            width = max_name_len
        );
    }
}

/// Display accuracy, confusion matrix and per-class scores.
pub fn display_evaluation(report: &EvaluationReport) {
    println!();
    println!(
        "=== Evaluation: {} ({}) ===",
        report.family.display_name(),
        report.family
    );
    println!();
    println!("Test rows: {}", report.n_samples);
    println!("Accuracy:  {:.4}", report.accuracy);
    if let Some(auc) = report.roc_auc {
        println!("ROC AUC:   {:.4}", auc);
    }

    let labels: Vec<String> = report.confusion.labels.iter().map(|l| format!("{}", l)).collect();
    let cell = labels.iter().map(String::len).max().unwrap_or(1).max(6);

    println!();
    println!("Confusion matrix (rows = true, columns = predicted):");
    print!("{:>cell$} |", "", cell = cell);
    for label in &labels {
        print!(" {:>cell$}", label, cell = cell);
    }
    println!();
    println!("{}", "-".repeat((cell + 1) * (labels.len() + 1) + 1));
    for (label, row) in labels.iter().zip(&report.confusion.counts) {
        print!("{:>cell$} |", label, cell = cell);
        for count in row {
            print!(" {:>cell$}", count, cell = cell);
        }
        println!();
    }

    println!();
    println!(
        "{:>cell$}  {:>9}  {:>9}  {:>9}  {:>7}",
        "class",
        "precision",
        "recall",
        "f1",
        "support",
        cell = cell
    );
    for (label, m) in labels.iter().zip(&report.classes) {
        println!(
            "{:>cell$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>7}",
            label,
            m.precision,
            m.recall,
            m.f1,
            m.support,
            cell = cell
        );
    }
    println!(
        "{:>cell$}  {:>9.4}  {:>9.4}  {:>9.4}  {:>7}",
        "macro",
        report.macro_precision,
        report.macro_recall,
        report.macro_f1,
        report.n_samples,
        cell = cell
    );
}
