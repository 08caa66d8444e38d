use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    node::{Impurity, Node, NodeIndex},
    split::{SplitCriterion, TrainingColumns, find_best_split},
};

/// Configuration for a single CART decision tree.
///
/// Construct via [`DecisionTreeConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default                  |
/// |---------------------|--------------------------|
/// | `criterion`         | `Gini`                   |
/// | `max_depth`         | `None` (unlimited)       |
/// | `min_samples_split` | 2                        |
/// | `min_samples_leaf`  | 1                        |
/// | `max_features`      | `None` (all features)    |
/// | `n_classes`         | `None` (max label + 1)   |
/// | `seed`              | 42                       |
#[derive(Debug, Clone)]
pub struct DecisionTreeConfig {
    pub(crate) criterion: SplitCriterion,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: Option<usize>,
    pub(crate) n_classes: Option<usize>,
    pub(crate) seed: u64,
}

impl DecisionTreeConfig {
    /// Create a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            n_classes: None,
            seed: 42,
        }
    }

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set the maximum tree depth (root is depth 0). `None` means unlimited.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum number of samples required to attempt a split.
    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Set the minimum number of samples required in each leaf after a split.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Set the number of features considered at each split. `None` means all.
    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Fix the width of leaf distributions.
    ///
    /// A forest sets this so that every tree reports the same classes even
    /// when a bootstrap sample happens to miss one.
    #[must_use]
    pub fn with_n_classes(mut self, n_classes: Option<usize>) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Set the random seed for feature subsampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Train a decision tree with unit sample weights.
    ///
    /// # Errors
    ///
    /// See [`DecisionTreeConfig::fit_weighted`].
    pub fn fit(&self, features: &[Vec<f64>], labels: &[usize]) -> Result<DecisionTree, RfError> {
        let weights = vec![1.0; features.len()];
        self.fit_weighted(features, labels, &weights)
    }

    /// Train a decision tree on row-major data with per-sample weights.
    ///
    /// `features[sample_idx][feature_idx]`, `labels[sample_idx]` zero-based,
    /// `weights[sample_idx]` non-negative.
    ///
    /// # Errors
    ///
    /// | Variant                             | When                                            |
    /// |-------------------------------------|-------------------------------------------------|
    /// | [`RfError::EmptyDataset`]           | `features` is empty                             |
    /// | [`RfError::ZeroFeatures`]           | rows have zero feature columns                  |
    /// | [`RfError::LabelCountMismatch`]     | `labels` or `weights` length differs from rows  |
    /// | [`RfError::FeatureCountMismatch`]   | rows have inconsistent lengths                  |
    /// | [`RfError::NonFiniteValue`]         | any value is NaN or infinite                    |
    /// | [`RfError::LabelOutOfRange`]        | a label is not below the configured `n_classes` |
    /// | [`RfError::InvalidMaxFeatures`]     | `max_features` outside [1, n_features]          |
    /// | [`RfError::InvalidMaxDepth`]        | `max_depth` is `Some(0)`                        |
    /// | [`RfError::InvalidMinSamplesSplit`] | `min_samples_split` < 2                         |
    /// | [`RfError::InvalidMinSamplesLeaf`]  | `min_samples_leaf` < 1                          |
    #[instrument(skip(self, features, labels, weights), fields(n_samples = features.len()))]
    pub fn fit_weighted(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        weights: &[f64],
    ) -> Result<DecisionTree, RfError> {
        let n_features = crate::forest::validate_features(features)?;
        let n_samples = features.len();
        for len in [labels.len(), weights.len()] {
            if len != n_samples {
                return Err(RfError::LabelCountMismatch {
                    n_samples,
                    n_labels: len,
                });
            }
        }

        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }

        let max_features = self.max_features.unwrap_or(n_features);
        if max_features == 0 || max_features > n_features {
            return Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            });
        }

        let n_classes = self
            .n_classes
            .unwrap_or_else(|| labels.iter().max().copied().unwrap_or(0) + 1);
        if let Some((sample_index, &label)) =
            labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
        {
            return Err(RfError::LabelOutOfRange {
                label,
                sample_index,
                n_classes,
            });
        }

        // Column-major copy for cache-friendly per-feature scans.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();
        let data = TrainingColumns {
            features: &col_features,
            labels,
            weights,
            n_classes,
        };

        let sample_indices: Vec<usize> = (0..n_samples).collect();
        let mut builder = TreeBuilder {
            data: &data,
            config: self,
            max_features,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            arena: Vec::new(),
        };
        builder.build(&sample_indices, 0);

        debug!(n_nodes = builder.arena.len(), n_classes, "decision tree built");

        Ok(DecisionTree {
            nodes: builder.arena,
            n_features,
            n_classes,
        })
    }
}

impl Default for DecisionTreeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive arena builder for one tree.
struct TreeBuilder<'a> {
    data: &'a TrainingColumns<'a>,
    config: &'a DecisionTreeConfig,
    max_features: usize,
    rng: ChaCha8Rng,
    arena: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, sample_indices: &[usize], depth: usize) -> NodeIndex {
        let n_samples = sample_indices.len();
        let class_totals = self.data.class_totals(sample_indices);
        let weighted_n_samples: f64 = class_totals.iter().sum();
        let impurity = self
            .config
            .criterion
            .impurity(&class_totals, weighted_n_samples);

        let depth_exceeded = self.config.max_depth.is_some_and(|max_d| depth >= max_d);
        let too_few = n_samples < self.config.min_samples_split;
        let pure = impurity.value() <= 0.0;

        if too_few || pure || depth_exceeded {
            return self.push_leaf(class_totals, impurity, n_samples);
        }

        let Some(split) = find_best_split(
            self.data,
            sample_indices,
            self.config.criterion,
            self.max_features,
            self.config.min_samples_leaf,
            &mut self.rng,
        ) else {
            return self.push_leaf(class_totals, impurity, n_samples);
        };

        // Reserve the slot, build children, then overwrite.
        let node_idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction: 0,
            distribution: Vec::new(),
            impurity,
            n_samples,
            weighted_n_samples,
        });

        let left = self.build(&split.left_indices, depth + 1);
        let right = self.build(&split.right_indices, depth + 1);

        self.arena[node_idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity,
            n_samples,
            weighted_n_samples,
            impurity_decrease: split.impurity_decrease,
        };

        NodeIndex::new(node_idx)
    }

    fn push_leaf(&mut self, class_totals: Vec<f64>, impurity: Impurity, n_samples: usize) -> NodeIndex {
        let weighted_n_samples: f64 = class_totals.iter().sum();
        let prediction = argmax(&class_totals);
        let distribution = if weighted_n_samples > 0.0 {
            class_totals.iter().map(|&w| w / weighted_n_samples).collect()
        } else {
            class_totals
        };
        let idx = self.arena.len();
        self.arena.push(Node::Leaf {
            prediction,
            distribution,
            impurity,
            n_samples,
            weighted_n_samples,
        });
        NodeIndex::new(idx)
    }
}

/// Index of the largest value; the lowest index wins ties.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// A fitted CART decision tree.
///
/// Stored as an arena `Vec<Node>`; the root is at index 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
}

impl DecisionTree {
    /// Predict the class label for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.leaf_for(sample)?.0)
    }

    /// Return the weighted class distribution of the leaf reached by `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<&[f64], RfError> {
        Ok(self.leaf_for(sample)?.1)
    }

    /// Mean Decrease in Impurity per feature, normalized to sum to 1.
    ///
    /// All zeros when the tree is a single leaf.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                totals[feature.index()] += impurity_decrease;
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }
        totals
    }

    /// Return the total number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the maximum depth of the tree; a lone root leaf has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node_idx, d)) = stack.pop() {
            match &self.nodes[node_idx] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((left.index(), d + 1));
                    stack.push((right.index(), d + 1));
                }
            }
        }
        max_depth
    }

    /// Walk from the root to a leaf; returns its prediction and distribution.
    fn leaf_for(&self, sample: &[f64]) -> Result<(usize, &[f64]), RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    prediction,
                    distribution,
                    ..
                } => return Ok((*prediction, distribution.as_slice())),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if sample[feature.index()] <= *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }
}
