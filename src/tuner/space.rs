//! Named hyperparameter domains and sampled values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// A single sampled hyperparameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(v) => write!(f, "'{}'", v),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One sampled configuration, keyed by parameter name.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a parameter set the way it is printed after tuning: `{'a': 1, 'b': 'x'}`.
pub fn format_params(params: &ParamSet) -> String {
    let body = params
        .iter()
        .map(|(k, v)| format!("'{}': {}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

/// The set of values a single hyperparameter may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Domain {
    Int { low: i64, high: i64, log: bool },
    Float { low: f64, high: f64, log: bool },
    Categorical { choices: Vec<ParamValue> },
}

impl Domain {
    pub fn int(low: i64, high: i64) -> Self {
        Domain::Int { low, high, log: false }
    }

    pub fn int_log(low: i64, high: i64) -> Self {
        Domain::Int { low, high, log: true }
    }

    pub fn float(low: f64, high: f64) -> Self {
        Domain::Float { low, high, log: false }
    }

    pub fn float_log(low: f64, high: f64) -> Self {
        Domain::Float { low, high, log: true }
    }

    pub fn categorical<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        Domain::Categorical {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Domain::Categorical { .. })
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (Domain::Int { low, high, .. }, ParamValue::Int(v)) => low <= v && v <= high,
            (Domain::Float { low, high, .. }, v) => match v.as_f64() {
                Some(v) => *low <= v && v <= *high,
                None => false,
            },
            (Domain::Categorical { choices }, v) => choices.contains(v),
            _ => false,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: String| Err(TunerError::InvalidSpace(format!("{}: {}", name, reason)));
        match self {
            Domain::Int { low, high, log } => {
                if low > high {
                    return invalid(format!("low {} > high {}", low, high));
                }
                if *log && *low <= 0 {
                    return invalid("log domain needs low > 0".to_string());
                }
            }
            Domain::Float { low, high, log } => {
                if !low.is_finite() || !high.is_finite() {
                    return invalid("bounds must be finite".to_string());
                }
                if low > high {
                    return invalid(format!("low {} > high {}", low, high));
                }
                if *log && *low <= 0.0 {
                    return invalid("log domain needs low > 0".to_string());
                }
            }
            Domain::Categorical { choices } => {
                if choices.is_empty() {
                    return invalid("no choices".to_string());
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = |log: bool| if log { " (log)" } else { "" };
        match self {
            Domain::Int { low, high, log } => write!(f, "int [{}, {}]{}", low, high, scale(*log)),
            Domain::Float { low, high, log } => {
                write!(f, "float [{}, {}]{}", low, high, scale(*log))
            }
            Domain::Categorical { choices } => {
                let names: Vec<String> = choices.iter().map(ToString::to_string).collect();
                write!(f, "{{{}}}", names.join(", "))
            }
        }
    }
}

/// An ordered list of named domains.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    params: Vec<(String, Domain)>,
}

impl SearchSpace {
    /// Rejects empty spaces, duplicate names and malformed domains.
    pub fn new(params: Vec<(String, Domain)>) -> Result<Self> {
        if params.is_empty() {
            return Err(TunerError::InvalidSpace("search space is empty".to_string()));
        }
        for (i, (name, domain)) in params.iter().enumerate() {
            if params[..i].iter().any(|(other, _)| other == name) {
                return Err(TunerError::InvalidSpace(format!(
                    "duplicate parameter '{}'",
                    name
                )));
            }
            domain.validate(name)?;
        }
        Ok(Self { params })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Domain)> {
        self.params.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Replace the domain of `name`, or append it if absent.
    pub fn with_domain(mut self, name: &str, domain: Domain) -> Result<Self> {
        domain.validate(name)?;
        match self.params.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = domain,
            None => self.params.push((name.to_string(), domain)),
        }
        Ok(self)
    }

    /// Every parameter in `params` that this space declares must lie in its domain.
    pub fn check(&self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            if let Some(domain) = self.get(name) {
                if !domain.contains(value) {
                    return Err(TunerError::OutOfDomain {
                        name: name.clone(),
                        reason: format!("{} not in {}", value, domain),
                    });
                }
            }
        }
        Ok(())
    }
}
