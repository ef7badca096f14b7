//! Study diagnostics: optimization history, per-parameter slices, pairwise
//! contours and parameter importances, computed as plain tables.
//!
//! Numeric parameters are grouped into equal-width bins over their domain
//! (in log space for log domains); categorical parameters group by choice.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::constants::{BAR_WIDTH, DIAGNOSTIC_BINS};
use crate::error::Result;
use crate::tuner::space::{Domain, ParamValue, SearchSpace};
use crate::tuner::study::{Study, TrialRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub trial: usize,
    pub value: f64,
    pub best_so_far: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceRow {
    pub param: String,
    pub bin: String,
    pub n_trials: usize,
    pub mean_value: f64,
    pub best_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourCell {
    pub x_param: String,
    pub y_param: String,
    pub x_bin: String,
    pub y_bin: String,
    pub n_trials: usize,
    pub mean_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamImportance {
    pub param: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub history: Vec<HistoryPoint>,
    pub slices: Vec<SliceRow>,
    pub contours: Vec<ContourCell>,
    /// Sorted by importance, highest first.
    pub importances: Vec<ParamImportance>,
}

/// Bin index and label of `value` within `domain`.
fn bin_of(domain: &Domain, value: &ParamValue) -> Option<(usize, String)> {
    match domain {
        Domain::Categorical { choices } => {
            let idx = choices.iter().position(|c| c == value)?;
            Some((idx, value.to_string()))
        }
        Domain::Int { low, high, .. } if high - low < DIAGNOSTIC_BINS as i64 => {
            let v = value.as_i64()?;
            Some(((v - low).max(0) as usize, v.to_string()))
        }
        Domain::Int { low, high, log } => numeric_bin(*low as f64, *high as f64, *log, value.as_f64()?),
        Domain::Float { low, high, log } => numeric_bin(*low, *high, *log, value.as_f64()?),
    }
}

fn numeric_bin(low: f64, high: f64, log: bool, v: f64) -> Option<(usize, String)> {
    let (fwd, back): (fn(f64) -> f64, fn(f64) -> f64) = if log {
        (f64::ln, f64::exp)
    } else {
        (|x| x, |x| x)
    };
    let (lo, hi) = (fwd(low), fwd(high));
    if hi <= lo {
        return Some((0, format!("{}", low)));
    }

    let width = (hi - lo) / DIAGNOSTIC_BINS as f64;
    let idx = (((fwd(v) - lo) / width).floor().max(0.0) as usize).min(DIAGNOSTIC_BINS - 1);
    let start = back(lo + width * idx as f64);
    let end = back(lo + width * (idx + 1) as f64);
    Some((idx, format!("{:.3}-{:.3}", start, end)))
}

/// Completed trials that carry `name`, with their bin and value.
fn binned<'a>(
    trials: &'a [&'a TrialRecord],
    name: &str,
    domain: &Domain,
) -> Vec<(&'a TrialRecord, usize, String, f64)> {
    trials
        .iter()
        .filter_map(|t| {
            let value = t.value?;
            let (idx, label) = bin_of(domain, t.params.get(name)?)?;
            Some((*t, idx, label, value))
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl Diagnostics {
    /// Tables over the completed trials of `study`.
    pub fn compute(study: &Study, space: &SearchSpace, contour_params: &[String]) -> Self {
        let completed: Vec<&TrialRecord> = study.completed().collect();

        let mut history = Vec::with_capacity(completed.len());
        let mut best = f64::NEG_INFINITY;
        for t in &completed {
            let value = t.value.unwrap_or(f64::NAN);
            best = best.max(value);
            history.push(HistoryPoint {
                trial: t.number,
                value,
                best_so_far: best,
            });
        }

        let all_values: Vec<f64> = completed.iter().filter_map(|t| t.value).collect();
        let total_ss: f64 = if all_values.is_empty() {
            0.0
        } else {
            let m = mean(&all_values);
            all_values.iter().map(|v| (v - m).powi(2)).sum()
        };

        let mut slices = Vec::new();
        let mut importances = Vec::new();
        for (name, domain) in space.iter() {
            let mut groups: BTreeMap<usize, (String, Vec<f64>)> = BTreeMap::new();
            for (_, idx, label, value) in binned(&completed, name, domain) {
                groups.entry(idx).or_insert_with(|| (label, Vec::new())).1.push(value);
            }

            // share of the objective's variance explained by this parameter's groups
            let n: usize = groups.values().map(|(_, v)| v.len()).sum();
            let between: f64 = if n == 0 {
                0.0
            } else {
                let grand = groups.values().flat_map(|(_, v)| v.iter()).sum::<f64>() / n as f64;
                groups
                    .values()
                    .map(|(_, v)| v.len() as f64 * (mean(v) - grand).powi(2))
                    .sum()
            };
            importances.push(ParamImportance {
                param: name.to_string(),
                importance: if total_ss > 0.0 { between / total_ss } else { 0.0 },
            });

            for (label, values) in groups.into_values() {
                slices.push(SliceRow {
                    param: name.to_string(),
                    bin: label,
                    n_trials: values.len(),
                    mean_value: mean(&values),
                    best_value: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                });
            }
        }

        let total: f64 = importances.iter().map(|p| p.importance).sum();
        if total > 0.0 {
            for p in &mut importances {
                p.importance /= total;
            }
        }
        importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        let mut contours = Vec::new();
        for (i, x_name) in contour_params.iter().enumerate() {
            for y_name in &contour_params[i + 1..] {
                let (Some(x_dom), Some(y_dom)) = (space.get(x_name), space.get(y_name)) else {
                    continue;
                };
                let mut cells: BTreeMap<(usize, usize), (String, String, Vec<f64>)> = BTreeMap::new();
                for t in &completed {
                    let (Some(value), Some(xv), Some(yv)) =
                        (t.value, t.params.get(x_name), t.params.get(y_name))
                    else {
                        continue;
                    };
                    let (Some((xi, xl)), Some((yi, yl))) = (bin_of(x_dom, xv), bin_of(y_dom, yv)) else {
                        continue;
                    };
                    cells
                        .entry((xi, yi))
                        .or_insert_with(|| (xl, yl, Vec::new()))
                        .2
                        .push(value);
                }
                for (x_bin, y_bin, values) in cells.into_values() {
                    contours.push(ContourCell {
                        x_param: x_name.clone(),
                        y_param: y_name.clone(),
                        x_bin,
                        y_bin,
                        n_trials: values.len(),
                        mean_value: mean(&values),
                    });
                }
            }
        }

        Self {
            history,
            slices,
            contours,
            importances,
        }
    }

    /// Print the history, slices and importances to stdout.
    pub fn print(&self) {
        println!("\n=== Optimization History ===\n");
        for p in &self.history {
            println!("  trial {:>4}: {:.4}  (best {:.4})", p.trial, p.value, p.best_so_far);
        }

        println!("\n=== Parameter Slices ===");
        let mut current = "";
        for row in &self.slices {
            if row.param != current {
                current = &row.param;
                println!("\n{}:", current);
            }
            println!(
                "  {:<24} n={:<4} mean={:.4} best={:.4}",
                row.bin, row.n_trials, row.mean_value, row.best_value
            );
        }

        if !self.contours.is_empty() {
            let pairs = self
                .contours
                .iter()
                .map(|c| (&c.x_param, &c.y_param))
                .collect::<std::collections::BTreeSet<_>>()
                .len();
            println!("\n=== Contours: {} parameter pairs, {} cells ===", pairs, self.contours.len());
        }

        println!("\n=== Parameter Importances ===\n");
        for p in &self.importances {
            let bar = "█".repeat((p.importance * BAR_WIDTH as f64).round() as usize);
            println!("  {:<20} {:>6.3} {}", p.param, p.importance, bar);
        }
        println!();
    }

    /// Write `history.csv`, `slice.csv`, `contour.csv` and `importance.csv` into `dir`.
    pub fn write_csv_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_rows(&dir.join("history.csv"), &self.history)?;
        write_rows(&dir.join("slice.csv"), &self.slices)?;
        write_rows(&dir.join("contour.csv"), &self.contours)?;
        write_rows(&dir.join("importance.csv"), &self.importances)?;
        info!(dir = %dir.display(), "wrote diagnostics");
        Ok(())
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuner::study::{FailurePolicy, RandomSampler, TrialOutcome};
    use tempfile::tempdir;

    fn study_and_space() -> (Study, SearchSpace) {
        let space = SearchSpace::new(vec![
            ("signal".into(), Domain::float(0.0, 1.0)),
            ("noise".into(), Domain::categorical(["a", "b"])),
        ])
        .unwrap();
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(11);
        study
            .optimize(&space, &mut sampler, 40, FailurePolicy::Abort, |p| {
                let v = p["signal"].as_f64().unwrap_or(0.0);
                Ok(TrialOutcome {
                    value: v,
                    fold_scores: vec![v],
                    train_accuracy: 1.0,
                })
            })
            .unwrap();
        (study, space)
    }

    #[test]
    fn test_history_is_monotone() {
        let (study, space) = study_and_space();
        let diag = Diagnostics::compute(&study, &space, &[]);

        assert_eq!(diag.history.len(), 40);
        for pair in diag.history.windows(2) {
            assert!(pair[1].best_so_far >= pair[0].best_so_far);
        }
    }

    #[test]
    fn test_importance_finds_signal() {
        let (study, space) = study_and_space();
        let diag = Diagnostics::compute(&study, &space, &[]);

        assert_eq!(diag.importances[0].param, "signal");
        let total: f64 = diag.importances.iter().map(|p| p.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_contour_cells_cover_trials() {
        let (study, space) = study_and_space();
        let params = vec!["signal".to_string(), "noise".to_string()];
        let diag = Diagnostics::compute(&study, &space, &params);

        let covered: usize = diag.contours.iter().map(|c| c.n_trials).sum();
        assert_eq!(covered, 40);
        assert!(diag.contours.len() <= DIAGNOSTIC_BINS * 2);
    }

    #[test]
    fn test_writes_csv_tables() {
        let (study, space) = study_and_space();
        let diag = Diagnostics::compute(&study, &space, &["signal".into(), "noise".into()]);
        let dir = tempdir().unwrap();

        diag.write_csv_dir(dir.path()).unwrap();

        for file in ["history.csv", "slice.csv", "contour.csv", "importance.csv"] {
            let content = fs::read_to_string(dir.path().join(file)).unwrap();
            assert!(content.lines().count() > 1, "{} is empty", file);
        }
    }
}
