//! Domain types for floodrisk-io.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};

use crate::IoError;

/// Name of the target column.
pub const LABEL_COLUMN: &str = "Class";

/// Columns never used as model inputs: identifiers and the label.
pub const DROPPED_COLUMNS: [&str; 3] = ["fid", "Class", "point_id"];

/// A CSV table as read from disk, cells kept as raw strings.
///
/// Produced by [`DatasetReader`](crate::DatasetReader). Every row has
/// exactly `column_names().len()` cells.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    column_names: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Numeric model inputs: one row per sample, one column per feature.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature column names in table order.
    pub feature_names: Vec<String>,
    /// Feature values: `rows[sample_index][feature_index]`.
    pub rows: Vec<Vec<f64>>,
}

/// Encoded target column.
///
/// `labels[i]` indexes into `class_names`.
#[derive(Debug, Clone)]
pub struct LabelVector {
    /// Distinct raw labels in sorted order.
    pub class_names: Vec<String>,
    /// Zero-based class index per sample.
    pub labels: Vec<usize>,
}

impl Dataset {
    pub(crate) fn new(path: PathBuf, column_names: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            path,
            column_names,
            rows,
        }
    }

    /// Return the path the table was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the number of data rows.
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Return the header names in file order.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Parse every column not named in `drop` as a finite float.
    ///
    /// Names in `drop` that are absent from the header are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NonFiniteValue`] for empty, unparseable, NaN or
    /// infinite cells.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn feature_matrix(&self, drop: &[&str]) -> Result<FeatureMatrix, IoError> {
        let kept: Vec<usize> = (0..self.column_names.len())
            .filter(|&c| !drop.contains(&self.column_names[c].as_str()))
            .collect();
        let feature_names: Vec<String> = kept.iter().map(|&c| self.column_names[c].clone()).collect();
        debug!(?feature_names, "selected feature columns");

        let rows = self
            .rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                kept.iter()
                    .map(|&c| self.parse_cell(row_index, c, &row[c]))
                    .collect::<Result<Vec<f64>, IoError>>()
            })
            .collect::<Result<Vec<_>, IoError>>()?;

        Ok(FeatureMatrix {
            feature_names,
            rows,
        })
    }

    /// Encode the `column` values as class indices.
    ///
    /// Distinct labels are sorted numerically when every one parses as a
    /// number and lexicographically otherwise; class `i` is the `i`-th label.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingLabelColumn`] | `column` is not in the header |
    /// | [`IoError::MissingLabelValue`] | A row has an empty label cell |
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn label_vector(&self, column: &str) -> Result<LabelVector, IoError> {
        let Some(col) = self.column_names.iter().position(|c| c == column) else {
            return Err(IoError::MissingLabelColumn {
                path: self.path.clone(),
                column: column.to_string(),
            });
        };

        let raw: Vec<&str> = self.rows.iter().map(|row| row[col].as_str()).collect();
        if let Some(row_index) = raw.iter().position(|v| v.is_empty()) {
            return Err(IoError::MissingLabelValue {
                path: self.path.clone(),
                row_index,
                column: column.to_string(),
            });
        }

        let mut class_names: Vec<String> = raw
            .iter()
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(String::from)
            .collect();
        let numeric: Option<Vec<f64>> = class_names.iter().map(|s| s.parse::<f64>().ok()).collect();
        if let Some(values) = numeric {
            let mut paired: Vec<(f64, String)> = values.into_iter().zip(class_names).collect();
            paired.sort_by(|a, b| a.0.total_cmp(&b.0));
            class_names = paired.into_iter().map(|(_, name)| name).collect();
        }

        let labels = raw
            .iter()
            .map(|v| {
                class_names
                    .iter()
                    .position(|name| name == v)
                    .unwrap_or_default()
            })
            .collect();

        if class_names.len() != 2 {
            warn!(n_classes = class_names.len(), ?class_names, "label column is not binary");
        }
        debug!(?class_names, "encoded labels");

        Ok(LabelVector {
            class_names,
            labels,
        })
    }

    fn parse_cell(&self, row_index: usize, col: usize, raw: &str) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                column: self.column_names[col].clone(),
                raw: raw.to_string(),
            }),
        }
    }
}

impl FeatureMatrix {
    /// Return the number of samples.
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    /// Return the number of feature columns.
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}
