use std::path::Path;

use crate::error::Result;
use crate::tuner::search::TunerResults;
use crate::tuner::space::{format_params, SearchSpace};
use crate::tuner::study::{TrialRecord, TrialState};

/// Write every trial to a CSV file, one column per parameter in `space`.
pub fn write_csv(trials: &[TrialRecord], space: &SearchSpace, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let names = space.names();
    let mut header = vec!["trial", "state", "value", "train_accuracy"];
    header.extend(names.iter().copied());
    header.push("error");
    wtr.write_record(&header)?;

    for trial in trials {
        let state = match trial.state {
            TrialState::Complete => "complete",
            TrialState::Failed => "failed",
        };
        let mut row = vec![
            trial.number.to_string(),
            state.to_string(),
            trial.value.map(|v| format!("{:.6}", v)).unwrap_or_default(),
            trial
                .train_accuracy
                .map(|v| format!("{:.6}", v))
                .unwrap_or_default(),
        ];
        for name in &names {
            row.push(
                trial
                    .params
                    .get(*name)
                    .map(|v| v.to_string().trim_matches('\'').to_string())
                    .unwrap_or_default(),
            );
        }
        row.push(trial.error.clone().unwrap_or_default());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print the best score and configuration.
pub fn print_summary(results: &TunerResults) {
    println!("\nAccuracy: {}", results.best_value());
    println!("Best hyperparameters: {}", format_params(&results.best.params));

    let failed = results.study.trials().len() - results.study.completed().count();
    if failed > 0 {
        println!("({} of {} trials failed and were skipped)", failed, results.study.trials().len());
    }
}

/// Print top-k completed trials to stdout.
pub fn print_topk(trials: &[TrialRecord], k: usize) {
    let mut ranked: Vec<&TrialRecord> = trials.iter().filter(|t| t.is_complete()).collect();
    ranked.sort_by(|a, b| {
        let (a, b) = (a.value.unwrap_or(f64::NEG_INFINITY), b.value.unwrap_or(f64::NEG_INFINITY));
        b.total_cmp(&a)
    });

    println!("\n=== Top {} Trials (by CV accuracy) ===\n", k.min(ranked.len()));

    for (i, trial) in ranked.iter().take(k).enumerate() {
        println!(
            "#{}: trial {} accuracy={:.4} train={:.4}",
            i + 1,
            trial.number,
            trial.value.unwrap_or(f64::NAN),
            trial.train_accuracy.unwrap_or(f64::NAN)
        );
        println!("    {}", format_params(&trial.params));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner::space::{Domain, ParamSet, ParamValue};
    use tempfile::tempdir;

    #[test]
    fn test_write_csv_includes_failed_trials() {
        let space = SearchSpace::new(vec![
            ("n".into(), Domain::int(1, 5)),
            ("mf".into(), Domain::categorical(["sqrt", "none"])),
        ])
        .unwrap();

        let mut params = ParamSet::new();
        params.insert("n".into(), ParamValue::Int(3));
        params.insert("mf".into(), "sqrt".into());
        let trials = vec![
            TrialRecord {
                number: 0,
                params: params.clone(),
                state: TrialState::Complete,
                value: Some(0.75),
                fold_scores: vec![0.7, 0.8],
                train_accuracy: Some(1.0),
                error: None,
            },
            TrialRecord {
                number: 1,
                params,
                state: TrialState::Failed,
                value: None,
                fold_scores: vec![],
                train_accuracy: None,
                error: Some("fit failed".into()),
            },
        ];

        let dir = tempdir().unwrap();
        let path = dir.path().join("trials.csv");
        write_csv(&trials, &space, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "trial,state,value,train_accuracy,n,mf,error");
        assert_eq!(lines[1], "0,complete,0.750000,1.000000,3,sqrt,");
        assert_eq!(lines[2], "1,failed,,,3,sqrt,fit failed");
    }
}
