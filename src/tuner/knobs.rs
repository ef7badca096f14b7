use serde::{Deserialize, Serialize};

use crate::constants::RF_CONTOUR_PARAMS;
use crate::data::RunContext;
use crate::error::{Result, TunerError};
use crate::models::{
    FittedModel, GradientBoosting, LogisticRegression, MaxFeatures, ModelFamily, RandomForest,
};
use crate::tuner::space::{Domain, ParamSet, ParamValue, SearchSpace};

/// Random forest knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    /// `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

/// Logistic regression knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    pub c: f64,
    pub max_iter: usize,
    pub fit_intercept: bool,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            fit_intercept: true,
        }
    }
}

/// Gradient boosting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub subsample: f64,
    pub colsample: f64,
    pub min_samples_leaf: usize,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            colsample: 1.0,
            min_samples_leaf: 1,
        }
    }
}

/// A fully typed configuration for one model family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params")]
pub enum ModelConfig {
    #[serde(rename = "RF")]
    RandomForest(RandomForestParams),
    #[serde(rename = "LGR")]
    Logistic(LogisticParams),
    #[serde(rename = "XGB")]
    Boosting(BoostingParams),
}

/// Default search space for a family.
pub fn default_space(family: ModelFamily) -> Result<SearchSpace> {
    let params = match family {
        ModelFamily::RandomForest => vec![
            ("n_estimators", Domain::int(50, 300)),
            ("max_depth", Domain::int_log(1, 32)),
            ("min_samples_split", Domain::int(2, 10)),
            ("min_samples_leaf", Domain::int(1, 10)),
            ("max_features", Domain::categorical(["sqrt", "log2", "none"])),
            ("bootstrap", Domain::categorical([true, false])),
        ],
        ModelFamily::LogisticRegression => vec![
            ("c", Domain::float_log(1e-3, 100.0)),
            ("max_iter", Domain::int(100, 1000)),
            ("fit_intercept", Domain::categorical([true, false])),
        ],
        ModelFamily::GradientBoosting => vec![
            ("n_estimators", Domain::int(50, 300)),
            ("max_depth", Domain::int(1, 10)),
            ("learning_rate", Domain::float_log(0.01, 0.3)),
            ("subsample", Domain::float(0.5, 1.0)),
            ("colsample", Domain::float(0.5, 1.0)),
            ("min_samples_leaf", Domain::int(1, 10)),
        ],
    };
    SearchSpace::new(params.into_iter().map(|(n, d)| (n.to_string(), d)).collect())
}

/// Parameters plotted pairwise in contour diagnostics.
pub fn contour_params(family: ModelFamily, space: &SearchSpace) -> Vec<String> {
    let numeric: Vec<&str> = space
        .iter()
        .filter(|(_, d)| d.is_numeric())
        .map(|(n, _)| n)
        .collect();

    let preferred: Vec<String> = match family {
        ModelFamily::RandomForest => RF_CONTOUR_PARAMS
            .iter()
            .filter(|name| space.get(name).is_some())
            .map(|name| name.to_string())
            .collect(),
        _ => Vec::new(),
    };
    if preferred.len() >= 2 {
        return preferred;
    }
    numeric.into_iter().take(5).map(String::from).collect()
}

/// Typed reads out of a [`ParamSet`], each checked against the space.
struct ParamReader<'a> {
    params: &'a ParamSet,
    allowed: &'static [&'static str],
}

impl<'a> ParamReader<'a> {
    fn new(
        params: &'a ParamSet,
        space: Option<&SearchSpace>,
        allowed: &'static [&'static str],
    ) -> Result<Self> {
        for name in params.keys() {
            if !allowed.contains(&name.as_str()) {
                return Err(TunerError::OutOfDomain {
                    name: name.clone(),
                    reason: "not a parameter of this model family".to_string(),
                });
            }
        }
        if let Some(space) = space {
            space.check(params)?;
        }
        Ok(Self { params, allowed })
    }

    fn get(&self, name: &str) -> Option<&'a ParamValue> {
        debug_assert!(self.allowed.contains(&name));
        self.params.get(name)
    }

    fn mismatch(name: &str, expected: &str, value: &ParamValue) -> TunerError {
        TunerError::OutOfDomain {
            name: name.to_string(),
            reason: format!("expected {}, got {}", expected, value),
        }
    }

    fn count(&self, name: &str, min: usize, default: usize) -> Result<usize> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match v.as_i64() {
                Some(n) if n >= min as i64 => Ok(n as usize),
                _ => Err(Self::mismatch(name, &format!("an integer >= {}", min), v)),
            },
        }
    }

    fn float(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_f64()
                .filter(|f| f.is_finite())
                .ok_or_else(|| Self::mismatch(name, "a number", v)),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v.as_bool().ok_or_else(|| Self::mismatch(name, "a boolean", v)),
        }
    }

    /// An integer depth, or `"none"` for unlimited.
    fn depth(&self, name: &str, default: Option<usize>) -> Result<Option<usize>> {
        match self.get(name) {
            None => Ok(default),
            Some(ParamValue::Str(s)) if s.eq_ignore_ascii_case("none") => Ok(None),
            Some(_) => self.count(name, 1, 1).map(Some),
        }
    }

    fn max_features(&self, name: &str, default: MaxFeatures) -> Result<MaxFeatures> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => match v.as_str().map(str::to_ascii_lowercase).as_deref() {
                Some("sqrt") => Ok(MaxFeatures::Sqrt),
                Some("log2") => Ok(MaxFeatures::Log2),
                Some("none") | Some("all") => Ok(MaxFeatures::All),
                _ => Err(Self::mismatch(name, "one of sqrt, log2, none", v)),
            },
        }
    }
}

const RF_PARAMS: &[&str] = &[
    "n_estimators",
    "max_depth",
    "min_samples_split",
    "min_samples_leaf",
    "max_features",
    "bootstrap",
];
const LGR_PARAMS: &[&str] = &["c", "max_iter", "fit_intercept"];
const XGB_PARAMS: &[&str] = &[
    "n_estimators",
    "max_depth",
    "learning_rate",
    "subsample",
    "colsample",
    "min_samples_leaf",
];

impl ModelConfig {
    pub fn default_for(family: ModelFamily) -> Self {
        match family {
            ModelFamily::RandomForest => ModelConfig::RandomForest(RandomForestParams::default()),
            ModelFamily::LogisticRegression => ModelConfig::Logistic(LogisticParams::default()),
            ModelFamily::GradientBoosting => ModelConfig::Boosting(BoostingParams::default()),
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            ModelConfig::RandomForest(_) => ModelFamily::RandomForest,
            ModelConfig::Logistic(_) => ModelFamily::LogisticRegression,
            ModelConfig::Boosting(_) => ModelFamily::GradientBoosting,
        }
    }

    /// Convert a sampled parameter set into typed knobs.
    ///
    /// Every value must lie in its domain in `space` and be meaningful for
    /// `family`; missing parameters take the family defaults.
    pub fn from_params(family: ModelFamily, params: &ParamSet, space: &SearchSpace) -> Result<Self> {
        Self::parse(family, params, Some(space))
    }

    /// Convert persisted parameters (a saved best trial or artifact header).
    ///
    /// Values are type-checked and must be usable by the estimator, but no
    /// search space is consulted.
    pub fn from_saved_params(family: ModelFamily, params: &ParamSet) -> Result<Self> {
        Self::parse(family, params, None)
    }

    fn parse(family: ModelFamily, params: &ParamSet, space: Option<&SearchSpace>) -> Result<Self> {
        match family {
            ModelFamily::RandomForest => {
                let r = ParamReader::new(params, space, RF_PARAMS)?;
                let d = RandomForestParams::default();
                Ok(ModelConfig::RandomForest(RandomForestParams {
                    n_estimators: r.count("n_estimators", 1, d.n_estimators)?,
                    max_depth: r.depth("max_depth", d.max_depth)?,
                    min_samples_split: r.count("min_samples_split", 2, d.min_samples_split)?,
                    min_samples_leaf: r.count("min_samples_leaf", 1, d.min_samples_leaf)?,
                    max_features: r.max_features("max_features", d.max_features)?,
                    bootstrap: r.flag("bootstrap", d.bootstrap)?,
                }))
            }
            ModelFamily::LogisticRegression => {
                let r = ParamReader::new(params, space, LGR_PARAMS)?;
                let d = LogisticParams::default();
                let c = r.float("c", d.c)?;
                if c <= 0.0 {
                    return Err(TunerError::OutOfDomain {
                        name: "c".to_string(),
                        reason: format!("must be positive, got {}", c),
                    });
                }
                Ok(ModelConfig::Logistic(LogisticParams {
                    c,
                    max_iter: r.count("max_iter", 1, d.max_iter)?,
                    fit_intercept: r.flag("fit_intercept", d.fit_intercept)?,
                }))
            }
            ModelFamily::GradientBoosting => {
                let r = ParamReader::new(params, space, XGB_PARAMS)?;
                let d = BoostingParams::default();
                let p = BoostingParams {
                    n_estimators: r.count("n_estimators", 1, d.n_estimators)?,
                    max_depth: r.count("max_depth", 1, d.max_depth)?,
                    learning_rate: r.float("learning_rate", d.learning_rate)?,
                    subsample: r.float("subsample", d.subsample)?,
                    colsample: r.float("colsample", d.colsample)?,
                    min_samples_leaf: r.count("min_samples_leaf", 1, d.min_samples_leaf)?,
                };
                for (name, v) in [("subsample", p.subsample), ("colsample", p.colsample)] {
                    if !(v > 0.0 && v <= 1.0) {
                        return Err(TunerError::OutOfDomain {
                            name: name.to_string(),
                            reason: format!("must be in (0, 1], got {}", v),
                        });
                    }
                }
                if p.learning_rate <= 0.0 {
                    return Err(TunerError::OutOfDomain {
                        name: "learning_rate".to_string(),
                        reason: format!("must be positive, got {}", p.learning_rate),
                    });
                }
                Ok(ModelConfig::Boosting(p))
            }
        }
    }

    /// The knobs as a parameter set, suitable for artifact headers.
    pub fn to_params(&self) -> ParamSet {
        let mut out = ParamSet::new();
        let mut put = |k: &str, v: ParamValue| {
            out.insert(k.to_string(), v);
        };
        match self {
            ModelConfig::RandomForest(p) => {
                put("n_estimators", ParamValue::Int(p.n_estimators as i64));
                put(
                    "max_depth",
                    match p.max_depth {
                        Some(d) => ParamValue::Int(d as i64),
                        None => "none".into(),
                    },
                );
                put("min_samples_split", ParamValue::Int(p.min_samples_split as i64));
                put("min_samples_leaf", ParamValue::Int(p.min_samples_leaf as i64));
                let mf = match p.max_features {
                    MaxFeatures::Sqrt => "sqrt",
                    MaxFeatures::Log2 => "log2",
                    MaxFeatures::All => "none",
                };
                put("max_features", mf.into());
                put("bootstrap", p.bootstrap.into());
            }
            ModelConfig::Logistic(p) => {
                put("c", p.c.into());
                put("max_iter", ParamValue::Int(p.max_iter as i64));
                put("fit_intercept", p.fit_intercept.into());
            }
            ModelConfig::Boosting(p) => {
                put("n_estimators", ParamValue::Int(p.n_estimators as i64));
                put("max_depth", ParamValue::Int(p.max_depth as i64));
                put("learning_rate", p.learning_rate.into());
                put("subsample", p.subsample.into());
                put("colsample", p.colsample.into());
                put("min_samples_leaf", ParamValue::Int(p.min_samples_leaf as i64));
            }
        }
        out
    }

    /// An unfitted estimator configured with these knobs and the run's seed and threads.
    pub fn build(&self, ctx: &RunContext) -> FittedModel {
        match self {
            ModelConfig::RandomForest(p) => FittedModel::RandomForest(
                RandomForest::new(p.n_estimators)
                    .with_max_depth(p.max_depth)
                    .with_min_samples_split(p.min_samples_split)
                    .with_min_samples_leaf(p.min_samples_leaf)
                    .with_max_features(p.max_features)
                    .with_bootstrap(p.bootstrap)
                    .with_random_state(ctx.model_seed)
                    .with_n_jobs(ctx.n_jobs),
            ),
            ModelConfig::Logistic(p) => FittedModel::LogisticRegression(
                LogisticRegression::new()
                    .with_c(p.c)
                    .with_max_iter(p.max_iter)
                    .with_fit_intercept(p.fit_intercept),
            ),
            ModelConfig::Boosting(p) => FittedModel::GradientBoosting(
                GradientBoosting::new(p.n_estimators)
                    .with_max_depth(p.max_depth)
                    .with_learning_rate(p.learning_rate)
                    .with_subsample(p.subsample)
                    .with_colsample(p.colsample)
                    .with_min_samples_leaf(p.min_samples_leaf)
                    .with_random_state(ctx.model_seed)
                    .with_n_jobs(ctx.n_jobs),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rf_params() -> ParamSet {
        let mut p = ParamSet::new();
        p.insert("n_estimators".into(), ParamValue::Int(120));
        p.insert("max_depth".into(), ParamValue::Int(8));
        p.insert("max_features".into(), "none".into());
        p.insert("bootstrap".into(), false.into());
        p
    }

    #[test]
    fn test_default_spaces_are_valid() {
        for family in ModelFamily::ALL {
            let space = default_space(family).unwrap();
            assert!(!space.is_empty());
        }
    }

    #[test]
    fn test_from_params_fills_defaults() {
        let space = default_space(ModelFamily::RandomForest).unwrap();
        let config = ModelConfig::from_params(ModelFamily::RandomForest, &rf_params(), &space).unwrap();

        match config {
            ModelConfig::RandomForest(p) => {
                assert_eq!(p.n_estimators, 120);
                assert_eq!(p.max_depth, Some(8));
                assert_eq!(p.max_features, MaxFeatures::All);
                assert!(!p.bootstrap);
                assert_eq!(p.min_samples_split, 2);
            }
            other => panic!("wrong family: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_out_of_domain() {
        let space = default_space(ModelFamily::RandomForest).unwrap();
        let mut params = rf_params();
        params.insert("n_estimators".into(), ParamValue::Int(1000));
        assert!(matches!(
            ModelConfig::from_params(ModelFamily::RandomForest, &params, &space),
            Err(TunerError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_saved_params_skip_domain_check() {
        let mut params = rf_params();
        params.insert("n_estimators".into(), ParamValue::Int(1000));
        let config = ModelConfig::from_saved_params(ModelFamily::RandomForest, &params).unwrap();
        assert_eq!(config.to_params().get("n_estimators"), Some(&ParamValue::Int(1000)));

        params.insert("min_samples_split".into(), ParamValue::Int(1));
        assert!(ModelConfig::from_saved_params(ModelFamily::RandomForest, &params).is_err());
    }

    #[test]
    fn test_rejects_foreign_and_mistyped_params() {
        let space = default_space(ModelFamily::LogisticRegression).unwrap();
        let mut params = ParamSet::new();
        params.insert("learning_rate".into(), ParamValue::Float(0.1));
        assert!(ModelConfig::from_params(ModelFamily::LogisticRegression, &params, &space).is_err());

        let mut params = ParamSet::new();
        params.insert("fit_intercept".into(), ParamValue::Int(1));
        assert!(ModelConfig::from_params(ModelFamily::LogisticRegression, &params, &space).is_err());
    }

    #[test]
    fn test_to_params_converts_back() {
        let space = default_space(ModelFamily::RandomForest).unwrap();
        let config = ModelConfig::from_params(ModelFamily::RandomForest, &rf_params(), &space).unwrap();
        let again = ModelConfig::from_params(ModelFamily::RandomForest, &config.to_params(), &space).unwrap();
        assert_eq!(config, again);
    }

    #[test]
    fn test_contour_params_for_forest() {
        let space = default_space(ModelFamily::RandomForest).unwrap();
        let names = contour_params(ModelFamily::RandomForest, &space);
        assert_eq!(names.len(), 5);
        assert!(names.contains(&"max_features".to_string()));

        let space = default_space(ModelFamily::GradientBoosting).unwrap();
        let names = contour_params(ModelFamily::GradientBoosting, &space);
        assert_eq!(names.len(), 5);
        assert!(!names.contains(&"min_samples_leaf".to_string()));
    }
}
