//! CSV loading, feature and label extraction, and output writing for floodrisk.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{DROPPED_COLUMNS, Dataset, FeatureMatrix, LABEL_COLUMN, LabelVector};
pub use error::IoError;
pub use reader::DatasetReader;
pub use writer::{prepare_output_path, write_json_report};
