use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::constants::{LGR_MODEL_FILE, RF_MODEL_FILE, XGB_MODEL_FILE};
use crate::error::TunerError;

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// The classifier families this crate can tune, train and report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModelFamily {
    #[serde(rename = "RF")]
    RandomForest,
    #[serde(rename = "LGR")]
    LogisticRegression,
    #[serde(rename = "XGB")]
    GradientBoosting,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 3] = [
        ModelFamily::RandomForest,
        ModelFamily::LogisticRegression,
        ModelFamily::GradientBoosting,
    ];

    /// Short label used on the command line and in artifact headers.
    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "RF",
            ModelFamily::LogisticRegression => "LGR",
            ModelFamily::GradientBoosting => "XGB",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::LogisticRegression => "Logistic Regression",
            ModelFamily::GradientBoosting => "Gradient Boosted Trees",
        }
    }

    /// Default location of the persisted model artifact.
    pub fn model_file(&self) -> &'static str {
        match self {
            ModelFamily::RandomForest => RF_MODEL_FILE,
            ModelFamily::LogisticRegression => LGR_MODEL_FILE,
            ModelFamily::GradientBoosting => XGB_MODEL_FILE,
        }
    }

    /// Default location of the persisted best trial.
    pub fn trial_file(&self) -> String {
        format!("{}_trial.json", self.label().to_lowercase())
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            ModelFamily::RandomForest => &["rf", "random_forest", "randomforest", "forest"],
            ModelFamily::LogisticRegression => &["lgr", "lr", "logistic", "logistic_regression"],
            ModelFamily::GradientBoosting => &["xgb", "gbt", "boosting", "gradient_boosting"],
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ModelFamily {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();

        for family in ModelFamily::ALL {
            if family.aliases().contains(&needle.as_str()) {
                return Ok(family);
            }
        }

        let needle = needle.as_str();
        let suggestion = ModelFamily::ALL
            .iter()
            .flat_map(|f| f.aliases().iter().map(move |a| (f, jaro_winkler(needle, a))))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(f, _)| f.label().to_string());

        Err(TunerError::UnknownFamily {
            label: s.to_string(),
            suggestion,
        })
    }
}

/// Parse a comma-separated list of family labels.
pub fn parse_families(s: &str) -> Result<Vec<ModelFamily>, TunerError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels_case_insensitive() {
        assert_eq!("RF".parse::<ModelFamily>().unwrap(), ModelFamily::RandomForest);
        assert_eq!("xgb".parse::<ModelFamily>().unwrap(), ModelFamily::GradientBoosting);
        assert_eq!(
            "Logistic".parse::<ModelFamily>().unwrap(),
            ModelFamily::LogisticRegression
        );
    }

    #[test]
    fn test_unknown_label_suggests_closest() {
        match "forrest".parse::<ModelFamily>() {
            Err(TunerError::UnknownFamily { suggestion, .. }) => {
                assert_eq!(suggestion.as_deref(), Some("RF"));
            }
            other => panic!("expected UnknownFamily, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_families_list() {
        let families = parse_families("RF, XGB").unwrap();
        assert_eq!(
            families,
            vec![ModelFamily::RandomForest, ModelFamily::GradientBoosting]
        );
        assert!(parse_families("RF,nope").is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&ModelFamily::LogisticRegression).unwrap();
        assert_eq!(json, "\"LGR\"");
    }

    #[test]
    fn test_trial_file_name() {
        assert_eq!(ModelFamily::RandomForest.trial_file(), "rf_trial.json");
    }
}
