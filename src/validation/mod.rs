pub mod kfold;
pub mod metrics;

pub use kfold::{cross_val_score, CvSplit, StratifiedKFold};
pub use metrics::{accuracy, macro_average, roc_auc, ClassMetrics, ConfusionMatrix};
