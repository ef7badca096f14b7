pub mod artifacts;
pub mod cli;
pub mod constants;
pub mod data;
pub mod error;
pub mod models;
pub mod report;
pub mod train;
pub mod tuner;
pub mod validation;

pub use error::{Result, TunerError};
pub use models::{Classifier, FittedModel, ModelFamily};
