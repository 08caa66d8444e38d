//! Per-class sample weighting.

/// How training samples are weighted by class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ClassWeight {
    /// Every sample has weight 1.
    #[default]
    Uniform,
    /// Weight each class by `n_samples / (n_present_classes * class_count)`,
    /// so every present class carries the same total mass.
    Balanced,
}

impl ClassWeight {
    /// Resolve to one weight per class index in `0..n_classes`.
    ///
    /// Classes absent from `labels` get weight 0 under `Balanced`; they
    /// contribute no samples either way.
    #[must_use]
    pub fn resolve(self, labels: &[usize], n_classes: usize) -> Vec<f64> {
        match self {
            ClassWeight::Uniform => vec![1.0; n_classes],
            ClassWeight::Balanced => {
                let mut counts = vec![0usize; n_classes];
                for &label in labels {
                    counts[label] += 1;
                }
                let n_present = counts.iter().filter(|&&c| c > 0).count();
                let n_samples = labels.len() as f64;
                counts
                    .iter()
                    .map(|&c| {
                        if c == 0 {
                            0.0
                        } else {
                            n_samples / (n_present as f64 * c as f64)
                        }
                    })
                    .collect()
            }
        }
    }
}
