use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// `class_weights[c]` is the summed sample weight of class `c` at the
    /// node and `total` is their sum. With unit weights these are plain
    /// counts. A node with zero mass is pure.
    #[must_use]
    pub fn impurity(&self, class_weights: &[f64], total: f64) -> Impurity {
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_weights
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_weights
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value.max(0.0))
    }
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Weighted impurity decrease: `W·I - W_l·I_l - W_r·I_r`.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Column-major training data shared by every node of a tree.
///
/// `features[feature_idx][sample_idx]`, with `labels` and `weights`
/// indexed by the same sample positions.
pub(crate) struct TrainingColumns<'a> {
    pub(crate) features: &'a [Vec<f64>],
    pub(crate) labels: &'a [usize],
    pub(crate) weights: &'a [f64],
    pub(crate) n_classes: usize,
}

impl TrainingColumns<'_> {
    /// Sum sample weights per class over `sample_indices`.
    pub(crate) fn class_totals(&self, sample_indices: &[usize]) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_classes];
        for &si in sample_indices {
            totals[self.labels[si]] += self.weights[si];
        }
        totals
    }
}

/// Find the best split among a random subset of features.
///
/// Features are visited in random order. Once `max_features` of them have
/// been scanned the search stops, unless none has produced a valid split
/// yet, in which case it keeps going through the remaining features.
///
/// For each visited feature, sorts the node's
/// samples by value and scans left to right, moving one sample at a time
/// and updating weighted class totals incrementally. Thresholds sit at the
/// midpoint between adjacent distinct values.
///
/// Returns `None` when no valid split exists (all candidate values
/// identical, or every boundary would leave fewer than `min_samples_leaf`
/// samples on a side).
pub(crate) fn find_best_split(
    data: &TrainingColumns<'_>,
    sample_indices: &[usize],
    criterion: SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = data.features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let parent_totals = data.class_totals(sample_indices);
    let parent_weight: f64 = parent_totals.iter().sum();
    let parent_impurity = criterion.impurity(&parent_totals, parent_weight);

    // Fisher-Yates over feature indices.
    let mut feature_order: Vec<usize> = (0..n_features).collect();
    for i in 0..n_features.saturating_sub(1) {
        let j = rng.gen_range(i..n_features);
        feature_order.swap(i, j);
    }
    let take = max_features.min(n_features);

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;

    for (visited, &feat_idx) in feature_order.iter().enumerate() {
        if visited >= take && best.is_some() {
            break;
        }
        let feat_col = &data.features[feat_idx];

        let mut sorted: Vec<(f64, usize)> = sample_indices
            .iter()
            .map(|&si| (feat_col[si], si))
            .collect();
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_totals = vec![0.0f64; data.n_classes];
        let mut right_totals = parent_totals.clone();
        let mut left_weight = 0.0f64;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let class_i = data.labels[si];
            let w = data.weights[si];

            left_totals[class_i] += w;
            right_totals[class_i] -= w;
            left_weight += w;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_weight = parent_weight - left_weight;
            let left_impurity = criterion.impurity(&left_totals, left_weight);
            let right_impurity = criterion.impurity(&right_totals, right_weight);

            let decrease = parent_weight * parent_impurity.value()
                - left_weight * left_impurity.value()
                - right_weight * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                best = Some((FeatureIndex::new(feat_idx), midpoint(val_i, val_next)));
            }
        }
    }

    let (feature, threshold) = best?;

    let feat_col = &data.features[feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);
    if left_indices.is_empty() || right_indices.is_empty() {
        return None;
    }

    Some(SplitResult {
        feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}

/// Threshold between two adjacent distinct values, `lo < hi`.
///
/// Falls back to `lo` when the midpoint rounds up to `hi` (neighbouring
/// floats) or overflows, so `x <= threshold` always separates the two.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= hi || !mid.is_finite() { lo } else { mid }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitCriterion, TrainingColumns, find_best_split, midpoint};

    #[test]
    fn gini_pure() {
        let imp = SplitCriterion::Gini.impurity(&[10.0, 0.0], 10.0);
        assert!(imp.value().abs() < f64::EPSILON);
    }

    #[test]
    fn gini_binary_balanced() {
        let imp = SplitCriterion::Gini.impurity(&[5.0, 5.0], 10.0);
        assert!((imp.value() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn entropy_binary_balanced() {
        let imp = SplitCriterion::Entropy.impurity(&[5.0, 5.0], 10.0);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn weights_shift_impurity() {
        // 7 negatives vs 3 positives, positives up-weighted to balance mass.
        let counts = SplitCriterion::Gini.impurity(&[7.0, 3.0], 10.0);
        let balanced = SplitCriterion::Gini.impurity(&[7.0 * (10.0 / 14.0), 3.0 * (10.0 / 6.0)], 10.0);
        assert!(counts.value() < balanced.value());
        assert!((balanced.value() - 0.5).abs() < 1e-10);
    }

    #[test]
    fn separable_data_finds_midpoint() {
        let features = vec![vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0]];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let weights = vec![1.0; 6];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&data, &indices, SplitCriterion::Gini, 1, 1, &mut rng)
            .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < f64::EPSILON);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
    }

    #[test]
    fn heavy_minority_moves_threshold() {
        // One positive at the low end: with unit weights isolating it is barely
        // worth it, with a large weight it must be isolated.
        let features = vec![vec![0.0, 1.0, 2.0, 3.0, 4.0]];
        let labels = vec![1, 0, 0, 0, 0];
        let weights = vec![4.0, 1.0, 1.0, 1.0, 1.0];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..5).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let split = find_best_split(&data, &indices, SplitCriterion::Gini, 1, 1, &mut rng)
            .expect("should find a split");
        assert_eq!(split.left_indices, vec![0]);
        // Parent gini over mass 8 with 4/4 split = 0.5, children pure.
        assert!((split.impurity_decrease - 4.0).abs() < 1e-10);
    }

    #[test]
    fn constant_feature_returns_none() {
        let features = vec![vec![5.0, 5.0, 5.0, 5.0]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&data, &indices, SplitCriterion::Gini, 1, 1, &mut rng).is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let features = vec![vec![1.0, 10.0]];
        let labels = vec![0, 1];
        let weights = vec![1.0; 2];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..2).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert!(find_best_split(&data, &indices, SplitCriterion::Gini, 1, 2, &mut rng).is_none());
    }

    #[test]
    fn midpoint_of_neighbouring_floats_stays_below_upper() {
        let lo = 1.0 + f64::EPSILON;
        let hi = 1.0 + 2.0 * f64::EPSILON;
        let t = midpoint(lo, hi);
        assert!(lo <= t && t < hi);
        assert!((midpoint(2.0, 4.0) - 3.0).abs() < f64::EPSILON);
        assert!(midpoint(f64::MAX / 2.0, f64::MAX).is_finite());
    }

    #[test]
    fn neighbouring_floats_split_into_two_non_empty_sides() {
        let features = vec![vec![1.0 + f64::EPSILON, 1.0 + 2.0 * f64::EPSILON]];
        let labels = vec![0, 1];
        let weights = vec![1.0; 2];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&data, &[0, 1], SplitCriterion::Gini, 1, 1, &mut rng)
            .expect("should find a split");
        assert_eq!(split.left_indices, vec![0]);
        assert_eq!(split.right_indices, vec![1]);
    }

    #[test]
    fn tied_values_never_straddle_threshold() {
        // Runs of equal values: the threshold may only fall between runs.
        let features = vec![vec![3.0, 1.0, 3.0, 1.0, 2.0, 2.0]];
        let labels = vec![1, 0, 1, 0, 1, 0];
        let weights = vec![1.0; 6];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let split = find_best_split(&data, &indices, SplitCriterion::Gini, 1, 1, &mut rng)
            .expect("should find a split");
        let max_left = split.left_indices.iter().map(|&i| features[0][i]).fold(f64::MIN, f64::max);
        let min_right = split.right_indices.iter().map(|&i| features[0][i]).fold(f64::MAX, f64::min);
        assert!(max_left < min_right);
        assert!(!split.left_indices.is_empty() && !split.right_indices.is_empty());
    }

    #[test]
    fn constant_feature_draw_falls_through_to_informative_one() {
        // Only one feature is sampled per node; whichever comes first, the
        // constant column cannot split, so the search must reach column 1.
        let features = vec![vec![5.0; 4], vec![1.0, 2.0, 8.0, 9.0]];
        let labels = vec![0, 0, 1, 1];
        let weights = vec![1.0; 4];
        let data = TrainingColumns {
            features: &features,
            labels: &labels,
            weights: &weights,
            n_classes: 2,
        };
        let indices: Vec<usize> = (0..4).collect();
        for seed in 0..16 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let split = find_best_split(&data, &indices, SplitCriterion::Gini, 1, 1, &mut rng)
                .expect("column 1 separates the classes");
            assert_eq!(split.feature.index(), 1);
            assert!((split.threshold - 5.0).abs() < f64::EPSILON);
        }
    }
}
