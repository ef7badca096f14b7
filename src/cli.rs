use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::constants::{
    DEFAULT_DATA_PATH, DEFAULT_MODEL_SEED, DEFAULT_SPLIT_SEED, DEFAULT_TARGET, DEFAULT_TEST_RATIO,
};
use crate::data::{CsvProvider, DataProvider, RunContext};
use crate::error::Result;
use crate::models::ModelFamily;

/// classifier_tuner: train and report on tuned classifiers.
#[derive(Parser, Debug)]
#[command(name = "classifier_tuner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Where the data comes from and how it is split.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// CSV file with a header row and numeric feature columns.
    #[arg(long, global = true, default_value = DEFAULT_DATA_PATH)]
    pub data: PathBuf,

    /// Name of the label column.
    #[arg(long, global = true, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Fraction of rows held out as the test split.
    #[arg(long, global = true, default_value_t = DEFAULT_TEST_RATIO)]
    pub test_ratio: f64,

    /// Seed for the train/test split.
    #[arg(long, global = true, default_value_t = DEFAULT_SPLIT_SEED)]
    pub split_seed: u64,

    /// Seed handed to every model.
    #[arg(long, global = true, default_value_t = DEFAULT_MODEL_SEED)]
    pub model_seed: u64,

    /// Worker threads for model fitting (default: all cores).
    #[arg(long, global = true)]
    pub n_jobs: Option<usize>,
}

impl DataArgs {
    /// Load and split the data once for the whole run.
    pub fn context(&self) -> Result<RunContext> {
        let provider = CsvProvider::new(&self.data, &self.target)
            .with_test_ratio(self.test_ratio)
            .with_seed(self.split_seed);
        let split = provider.load()?;
        Ok(RunContext::new(split)
            .with_model_seed(self.model_seed)
            .with_n_jobs(self.n_jobs))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print feature importances and evaluations for the persisted models.
    Report {
        /// Families to report feature importances for (comma-separated).
        #[arg(long, default_value = "RF,XGB")]
        importance: String,

        /// Families to evaluate on the test split (comma-separated).
        #[arg(long, default_value = "RF,XGB")]
        evaluate: String,

        /// Directory holding rf_model.json, lgr_model.json and xgb_model.json.
        #[arg(long, default_value = ".")]
        models_dir: PathBuf,

        /// Override the random forest artifact path.
        #[arg(long)]
        rf_model: Option<PathBuf>,

        /// Override the logistic regression artifact path.
        #[arg(long)]
        lgr_model: Option<PathBuf>,

        /// Override the gradient boosting artifact path.
        #[arg(long)]
        xgb_model: Option<PathBuf>,
    },

    /// Fit one family on the training split and save its model artifact.
    Train {
        /// Model family: RF, LGR or XGB.
        #[arg(long)]
        family: ModelFamily,

        /// Best-trial artifact to take hyperparameters from.
        #[arg(long)]
        from_trial: Option<PathBuf>,

        /// Output path (default: the family's model file).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Report {
            importance: "RF,XGB".to_string(),
            evaluate: "RF,XGB".to_string(),
            models_dir: PathBuf::from("."),
            rf_model: None,
            lgr_model: None,
            xgb_model: None,
        }
    }
}

/// Install the fmt subscriber; `RUST_LOG` overrides the default filter.
///
/// Logs go to stderr so stdout carries only the reports.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "classifier_tuner_rs=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
