//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::RfError;

/// A confusion matrix over class indices.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LabelCountMismatch`] | Slices differ in length |
    /// | [`RfError::LabelOutOfRange`] | A label is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(RfError::LabelCountMismatch {
                n_samples: true_labels.len(),
                n_labels: predicted.len(),
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            if t >= n_classes || p >= n_classes {
                return Err(RfError::LabelOutOfRange {
                    label: t.max(p),
                    sample_index,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.matrix[c][c];
                let predicted_c: usize = self.matrix.iter().map(|row| row[c]).sum();
                let support: usize = self.matrix[c].iter().sum();
                let precision = if predicted_c == 0 {
                    0.0
                } else {
                    tp as f64 / predicted_c as f64
                };
                let recall = if support == 0 {
                    0.0
                } else {
                    tp as f64 / support as f64
                };
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl fmt::Display for ConfusionMatrix {
    /// Bracketed rows, columns right-aligned to the widest count.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);

        for (i, row) in self.matrix.iter().enumerate() {
            let open = if i == 0 { "[[" } else { " [" };
            let close = if i + 1 == self.n_classes { "]]" } else { "]" };
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>width$}")).collect();
            writeln!(f, "{open}{}{close}", cells.join(" "))?;
        }
        Ok(())
    }
}
