pub mod boosting;
pub mod classifier;
pub mod family;
pub mod fitted;
pub mod forest;
pub mod logistic;
pub mod tree;

pub use boosting::GradientBoosting;
pub use classifier::Classifier;
pub use family::{parse_families, ModelFamily};
pub use fitted::FittedModel;
pub use forest::{MaxFeatures, RandomForest};
pub use logistic::LogisticRegression;
pub use tree::{Criterion, DecisionTree, TreeNode};
