//! Trial bookkeeping and the sampling loop.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TunerError};
use crate::tuner::space::{format_params, Domain, ParamSet, ParamValue, SearchSpace};

/// Draws one configuration per trial.
pub trait Sampler {
    fn sample(&mut self, space: &SearchSpace) -> ParamSet;
}

/// Independent uniform (or log-uniform) draws per parameter.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample_domain(&mut self, domain: &Domain) -> ParamValue {
        match domain {
            Domain::Int { low, high, log } => {
                if *log {
                    // widen by half a step so the end points keep their share
                    let lo = (*low as f64 - 0.5).max(0.5).ln();
                    let hi = (*high as f64 + 0.5).ln();
                    let v = self.rng.gen_range(lo..=hi).exp().round() as i64;
                    ParamValue::Int(v.clamp(*low, *high))
                } else {
                    ParamValue::Int(self.rng.gen_range(*low..=*high))
                }
            }
            Domain::Float { low, high, log } => {
                let v = if *log {
                    self.rng.gen_range(low.ln()..=high.ln()).exp()
                } else {
                    self.rng.gen_range(*low..=*high)
                };
                ParamValue::Float(v.clamp(*low, *high))
            }
            Domain::Categorical { choices } => {
                choices[self.rng.gen_range(0..choices.len())].clone()
            }
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace) -> ParamSet {
        space
            .iter()
            .map(|(name, domain)| (name.to_string(), self.sample_domain(domain)))
            .collect()
    }
}

/// What to do when a trial's objective returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the study and return the error.
    #[default]
    Abort,
    /// Record the trial as failed and keep going.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Complete,
    Failed,
}

/// Scores produced by one successful objective call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Mean cross-validation accuracy.
    pub value: f64,
    pub fold_scores: Vec<f64>,
    /// Accuracy of the model fit on the full training split.
    pub train_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub number: usize,
    pub params: ParamSet,
    pub state: TrialState,
    pub value: Option<f64>,
    #[serde(default)]
    pub fold_scores: Vec<f64>,
    pub train_accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialRecord {
    pub fn is_complete(&self) -> bool {
        self.state == TrialState::Complete
    }
}

/// A maximizing study: every trial run so far.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Study {
    trials: Vec<TrialRecord>,
}

impl Study {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn completed(&self) -> impl Iterator<Item = &TrialRecord> {
        self.trials.iter().filter(|t| t.is_complete())
    }

    /// Completed trial with the highest value; the earliest one wins ties.
    pub fn best_trial(&self) -> Option<&TrialRecord> {
        self.completed().fold(None, |best: Option<&TrialRecord>, t| match best {
            Some(b) if b.value >= t.value => Some(b),
            _ => Some(t),
        })
    }

    /// Run exactly `n_trials` trials, sampling from `space` and scoring with `objective`.
    ///
    /// Under [`FailurePolicy::Abort`] the first objective error is returned.
    /// Under [`FailurePolicy::Skip`] it is recorded and the trial still counts.
    pub fn optimize<S, F>(
        &mut self,
        space: &SearchSpace,
        sampler: &mut S,
        n_trials: usize,
        policy: FailurePolicy,
        mut objective: F,
    ) -> Result<()>
    where
        S: Sampler + ?Sized,
        F: FnMut(&ParamSet) -> Result<TrialOutcome>,
    {
        let mut best_value = self.best_trial().and_then(|t| t.value);

        for i in 0..n_trials {
            let number = self.trials.len();
            let params = sampler.sample(space);

            let record = match objective(&params) {
                Ok(outcome) => {
                    info!(
                        trial = number,
                        value = outcome.value,
                        train_accuracy = outcome.train_accuracy,
                        "trial finished"
                    );
                    if best_value.is_none_or(|b| outcome.value > b) {
                        best_value = Some(outcome.value);
                        println!(
                            "[{}/{}] New best: accuracy={:.4} params={}",
                            i + 1,
                            n_trials,
                            outcome.value,
                            format_params(&params)
                        );
                    }
                    TrialRecord {
                        number,
                        params,
                        state: TrialState::Complete,
                        value: Some(outcome.value),
                        fold_scores: outcome.fold_scores,
                        train_accuracy: Some(outcome.train_accuracy),
                        error: None,
                    }
                }
                Err(e) => match policy {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Skip => {
                        warn!(trial = number, error = %e, "trial failed, skipping");
                        TrialRecord {
                            number,
                            params,
                            state: TrialState::Failed,
                            value: None,
                            fold_scores: Vec::new(),
                            train_accuracy: None,
                            error: Some(e.to_string()),
                        }
                    }
                },
            };
            self.trials.push(record);

            if (i + 1) % (n_trials / 10).max(1) == 0 {
                let pct = ((i + 1) as f64 / n_trials as f64) * 100.0;
                eprint!("\r{:.0}% complete", pct);
            }
        }
        if n_trials > 0 {
            eprintln!();
        }

        if self.best_trial().is_none() {
            return Err(TunerError::NoCompletedTrials(self.trials.len()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> SearchSpace {
        SearchSpace::new(vec![
            ("n".into(), Domain::int(50, 300)),
            ("depth".into(), Domain::int_log(1, 32)),
            ("lr".into(), Domain::float_log(0.01, 0.3)),
            ("mf".into(), Domain::categorical(["sqrt", "log2", "none"])),
        ])
        .unwrap()
    }

    #[test]
    fn test_samples_stay_in_domain() {
        let space = space();
        let mut sampler = RandomSampler::new(7);
        for _ in 0..200 {
            let params = sampler.sample(&space);
            assert_eq!(params.len(), 4);
            space.check(&params).unwrap();
        }
    }

    #[test]
    fn test_log_int_reaches_both_ends() {
        let space = SearchSpace::new(vec![("d".into(), Domain::int_log(1, 4))]).unwrap();
        let mut sampler = RandomSampler::new(1);
        let drawn: Vec<i64> = (0..500)
            .filter_map(|_| sampler.sample(&space)["d"].as_i64())
            .collect();
        assert!(drawn.contains(&1));
        assert!(drawn.contains(&4));
    }

    #[test]
    fn test_optimize_runs_exact_budget() {
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(3);
        study
            .optimize(&space(), &mut sampler, 7, FailurePolicy::Abort, |p| {
                let n = p["n"].as_i64().unwrap_or(0) as f64;
                Ok(TrialOutcome {
                    value: n / 300.0,
                    fold_scores: vec![n / 300.0],
                    train_accuracy: 1.0,
                })
            })
            .unwrap();

        assert_eq!(study.trials().len(), 7);
        let best = study.best_trial().unwrap();
        let max = study
            .trials()
            .iter()
            .filter_map(|t| t.value)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.value, Some(max));
    }

    #[test]
    fn test_abort_policy_returns_error() {
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(3);
        let result = study.optimize(&space(), &mut sampler, 5, FailurePolicy::Abort, |_| {
            Err(TunerError::InvalidInput("boom".into()))
        });
        assert!(matches!(result, Err(TunerError::InvalidInput(_))));
        assert!(study.trials().is_empty());
    }

    #[test]
    fn test_skip_policy_counts_failures() {
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(3);
        let mut calls = 0;
        study
            .optimize(&space(), &mut sampler, 6, FailurePolicy::Skip, |_| {
                calls += 1;
                if calls % 2 == 0 {
                    Err(TunerError::InvalidInput("even".into()))
                } else {
                    Ok(TrialOutcome {
                        value: calls as f64,
                        fold_scores: vec![],
                        train_accuracy: 0.5,
                    })
                }
            })
            .unwrap();

        assert_eq!(study.trials().len(), 6);
        assert_eq!(study.completed().count(), 3);
        assert_eq!(study.best_trial().unwrap().value, Some(5.0));
    }

    #[test]
    fn test_all_failed_is_error() {
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(3);
        let result = study.optimize(&space(), &mut sampler, 3, FailurePolicy::Skip, |_| {
            Err(TunerError::InvalidInput("nope".into()))
        });
        assert!(matches!(result, Err(TunerError::NoCompletedTrials(3))));
    }

    #[test]
    fn test_best_trial_first_wins_ties() {
        let mut study = Study::new();
        let mut sampler = RandomSampler::new(9);
        study
            .optimize(&space(), &mut sampler, 4, FailurePolicy::Abort, |_| {
                Ok(TrialOutcome {
                    value: 0.5,
                    fold_scores: vec![],
                    train_accuracy: 0.5,
                })
            })
            .unwrap();
        assert_eq!(study.best_trial().unwrap().number, 0);
    }
}
