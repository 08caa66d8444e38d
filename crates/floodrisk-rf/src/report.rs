//! Hold-out evaluation report: accuracy, confusion matrix, per-class scores.

use std::fmt;

use crate::confusion::{ClassMetrics, ConfusionMatrix};
use crate::error::RfError;

/// Unweighted or support-weighted mean of per-class scores.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct AveragedMetrics {
    /// Mean precision.
    pub precision: f64,
    /// Mean recall.
    pub recall: f64,
    /// Mean F1.
    pub f1: f64,
    /// Total support.
    pub support: usize,
}

/// Evaluation of a classifier's predictions against held-out labels.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    class_names: Vec<String>,
    confusion: ConfusionMatrix,
    class_metrics: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Score `predicted` against `true_labels`.
    ///
    /// `class_names[i]` names class index `i` and fixes the matrix size.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfusionMatrix::from_labels`] errors.
    pub fn new(
        true_labels: &[usize],
        predicted: &[usize],
        class_names: &[String],
    ) -> Result<Self, RfError> {
        let confusion = ConfusionMatrix::from_labels(true_labels, predicted, class_names.len())?;
        let class_metrics = confusion.class_metrics();
        Ok(Self {
            class_names: class_names.to_vec(),
            confusion,
            class_metrics,
        })
    }

    /// Fraction of correct predictions, in [0, 1].
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }

    /// Return the confusion matrix.
    #[must_use]
    pub fn confusion_matrix(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    /// Return per-class metrics in class index order.
    #[must_use]
    pub fn class_metrics(&self) -> &[ClassMetrics] {
        &self.class_metrics
    }

    /// Return the class names in class index order.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    /// Unweighted mean over classes.
    #[must_use]
    pub fn macro_avg(&self) -> AveragedMetrics {
        let n = self.class_metrics.len().max(1) as f64;
        AveragedMetrics {
            precision: self.class_metrics.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: self.class_metrics.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: self.class_metrics.iter().map(|m| m.f1).sum::<f64>() / n,
            support: self.confusion.total(),
        }
    }

    /// Mean over classes weighted by support.
    #[must_use]
    pub fn weighted_avg(&self) -> AveragedMetrics {
        let total = self.confusion.total();
        let denom = total.max(1) as f64;
        let weighted = |score: fn(&ClassMetrics) -> f64| {
            self.class_metrics
                .iter()
                .map(|m| score(m) * m.support as f64)
                .sum::<f64>()
                / denom
        };
        AveragedMetrics {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support: total,
        }
    }
}

impl fmt::Display for EvaluationReport {
    /// Fixed-width classification table.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .class_names
            .iter()
            .map(String::len)
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>name_width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in self.class_names.iter().zip(&self.class_metrics) {
            writeln!(
                f,
                "{name:>name_width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>name_width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy(),
            self.confusion.total()
        )?;
        for (label, avg) in [("macro avg", self.macro_avg()), ("weighted avg", self.weighted_avg())] {
            writeln!(
                f,
                "{label:>name_width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        vec!["0".to_string(), "1".to_string()]
    }

    #[test]
    fn averages_over_imbalanced_classes() {
        // Class 0: 8 samples, all right. Class 1: 2 samples, one right.
        let truth = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let pred = [0, 0, 0, 0, 0, 0, 0, 0, 1, 0];
        let report = EvaluationReport::new(&truth, &pred, &classes()).unwrap();

        assert!((report.accuracy() - 0.9).abs() < 1e-12);
        let m = report.class_metrics();
        assert!((m[0].precision - 8.0 / 9.0).abs() < 1e-12);
        assert!((m[1].recall - 0.5).abs() < 1e-12);

        let macro_avg = report.macro_avg();
        assert!((macro_avg.recall - 0.75).abs() < 1e-12);
        assert_eq!(macro_avg.support, 10);

        let weighted = report.weighted_avg();
        assert!((weighted.recall - 0.9).abs() < 1e-12);
    }

    #[test]
    fn display_lists_every_row() {
        let report = EvaluationReport::new(&[0, 1, 1], &[0, 1, 0], &classes()).unwrap();
        let text = format!("{report}");
        for needle in ["precision", "f1-score", "accuracy", "macro avg", "weighted avg"] {
            assert!(text.contains(needle), "missing {needle} in\n{text}");
        }
        assert!(text.contains("0.67"));
    }
}
