//! Stratified train/test hold-out split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::error::RfError;

/// Stratified hold-out configuration.
///
/// Construct via [`StratifiedSplit::new`], then chain `with_seed` if desired.
#[derive(Debug, Clone)]
pub struct StratifiedSplit {
    test_fraction: f64,
    seed: u64,
}

/// Sample indices of the two partitions.
///
/// Together `train` and `test` hold every index in `0..n_samples` exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    /// Indices of training samples.
    pub train: Vec<usize>,
    /// Indices of held-out samples.
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Gather rows at `indices` from `items`.
    #[must_use]
    pub fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| items[i].clone()).collect()
    }
}

impl StratifiedSplit {
    /// Create a split holding out `test_fraction` of the samples.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTestFraction`] unless `0 < test_fraction < 1`.
    pub fn new(test_fraction: f64) -> Result<Self, RfError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(RfError::InvalidTestFraction {
                fraction: test_fraction,
            });
        }
        Ok(Self {
            test_fraction,
            seed: 42,
        })
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the held-out fraction.
    #[must_use]
    pub fn test_fraction(&self) -> f64 {
        self.test_fraction
    }

    /// Partition sample indices so each class keeps its share in both sides.
    ///
    /// The test side gets `ceil(test_fraction * n)` samples. Each class
    /// receives the floor of its proportional share; leftover slots go to the
    /// classes with the largest fractional remainders, lowest class index
    /// first on ties. Classes are shuffled independently before the cut and
    /// both partitions are shuffled afterwards.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::TooFewSamplesForSplit`] | Either partition would be empty |
    /// | [`RfError::ClassTooSmallForStratification`] | A class has exactly one sample |
    /// | [`RfError::LabelOutOfRange`] | A label is `>= n_classes` |
    #[instrument(skip_all, fields(n_samples = labels.len(), test_fraction = self.test_fraction))]
    pub fn split(&self, labels: &[usize], n_classes: usize) -> Result<SplitIndices, RfError> {
        let n_samples = labels.len();
        let n_test = (self.test_fraction * n_samples as f64).ceil() as usize;
        if n_test == 0 || n_test >= n_samples {
            return Err(RfError::TooFewSamplesForSplit {
                n_samples,
                fraction: self.test_fraction,
            });
        }

        let mut class_indices: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (sample_index, &label) in labels.iter().enumerate() {
            let Some(bucket) = class_indices.get_mut(label) else {
                return Err(RfError::LabelOutOfRange {
                    label,
                    sample_index,
                    n_classes,
                });
            };
            bucket.push(sample_index);
        }
        if let Some((class, members)) = class_indices
            .iter()
            .enumerate()
            .find(|(_, members)| members.len() == 1)
        {
            return Err(RfError::ClassTooSmallForStratification {
                class,
                count: members.len(),
            });
        }

        let counts: Vec<usize> = class_indices.iter().map(Vec::len).collect();
        let test_counts = allocate(&counts, n_test);
        debug!(?counts, ?test_counts, "per-class hold-out allocation");

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut train = Vec::with_capacity(n_samples - n_test);
        let mut test = Vec::with_capacity(n_test);
        for (members, &take) in class_indices.iter_mut().zip(&test_counts) {
            members.shuffle(&mut rng);
            let (held_out, kept) = members.split_at(take);
            test.extend_from_slice(held_out);
            train.extend_from_slice(kept);
        }
        train.shuffle(&mut rng);
        test.shuffle(&mut rng);

        Ok(SplitIndices { train, test })
    }
}

/// Distribute `n_draw` slots across classes in proportion to `counts`.
fn allocate(counts: &[usize], n_draw: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| n_draw as f64 * c as f64 / total as f64)
        .collect();
    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    let mut remaining = n_draw - alloc.iter().sum::<usize>();
    let mut order: Vec<usize> = (0..counts.len()).collect();
    // Stable sort keeps lower class indices first among equal remainders.
    order.sort_by(|&a, &b| {
        let ra = exact[a] - alloc[a] as f64;
        let rb = exact[b] - alloc[b] as f64;
        rb.total_cmp(&ra)
    });
    for &class in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        if alloc[class] < counts[class] {
            alloc[class] += 1;
            remaining -= 1;
        }
    }
    alloc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced(n_neg: usize, n_pos: usize) -> Vec<usize> {
        std::iter::repeat_n(0, n_neg)
            .chain(std::iter::repeat_n(1, n_pos))
            .collect()
    }

    fn count(labels: &[usize], indices: &[usize], class: usize) -> usize {
        indices.iter().filter(|&&i| labels[i] == class).count()
    }

    #[test]
    fn thousand_rows_seventy_thirty() {
        let labels = imbalanced(700, 300);
        let split = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();

        assert_eq!(split.train.len(), 700);
        assert_eq!(split.test.len(), 300);
        assert_eq!(count(&labels, &split.test, 0), 210);
        assert_eq!(count(&labels, &split.test, 1), 90);
        assert_eq!(count(&labels, &split.train, 0), 490);
        assert_eq!(count(&labels, &split.train, 1), 210);
    }

    #[test]
    fn partitions_cover_every_index_once() {
        let labels = imbalanced(37, 14);
        let split = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..51).collect::<Vec<_>>());
    }

    #[test]
    fn ratio_within_one_sample() {
        for (n_neg, n_pos) in [(37, 14), (50, 3), (101, 99), (9, 2)] {
            let labels = imbalanced(n_neg, n_pos);
            let n = labels.len();
            let split = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();
            assert_eq!(split.train.len() + split.test.len(), n);

            let expected_pos = split.test.len() as f64 * n_pos as f64 / n as f64;
            let got_pos = count(&labels, &split.test, 1) as f64;
            assert!(
                (got_pos - expected_pos).abs() <= 1.0,
                "{n_neg}/{n_pos}: expected ~{expected_pos} positives in test, got {got_pos}"
            );
        }
    }

    #[test]
    fn same_seed_same_partition() {
        let labels = imbalanced(60, 40);
        let a = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();
        let b = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();
        let c = StratifiedSplit::new(0.3).unwrap().with_seed(7).split(&labels, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn allocation_hands_remainder_to_largest_fraction() {
        // 0.3 * 10 = 3 test slots over counts 5/3/2: exact 1.5/0.9/0.6.
        assert_eq!(allocate(&[5, 3, 2], 3), vec![1, 1, 1]);
        assert_eq!(allocate(&[700, 300], 300), vec![210, 90]);
    }

    #[test]
    fn singleton_class_rejected() {
        let err = StratifiedSplit::new(0.3).unwrap().split(&[0, 0, 0, 1], 2).unwrap_err();
        assert!(matches!(err, RfError::ClassTooSmallForStratification { class: 1, count: 1 }));
    }

    #[test]
    fn invalid_fraction_rejected() {
        for fraction in [0.0, 1.0, -0.2, f64::NAN] {
            assert!(StratifiedSplit::new(fraction).is_err(), "{fraction} accepted");
        }
    }

    #[test]
    fn too_small_dataset_rejected() {
        let err = StratifiedSplit::new(0.3).unwrap().split(&[0], 1).unwrap_err();
        assert!(matches!(err, RfError::TooFewSamplesForSplit { .. }));
    }
}
