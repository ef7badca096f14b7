mod context;
mod dataset;
mod loader;

pub use context::RunContext;
pub use dataset::{DataSplit, Dataset};
pub use loader::{load_csv, train_test_split, CsvProvider, DataProvider};
