//! Configuration builder for Random Forest training.

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitCriterion;
use crate::weights::ClassWeight;

/// Strategy for determining the number of features to consider at each split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxFeatures {
    /// Square root of total features.
    Sqrt,
    /// Log base 2 of total features.
    Log2,
    /// A fraction of total features (must be in (0.0, 1.0]).
    Fraction(f64),
    /// A fixed count.
    Fixed(usize),
    /// All features (no subsampling).
    All,
}

/// Configuration for Random Forest training.
///
/// Construct via [`RandomForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default    |
/// |---------------------|------------|
/// | `max_features`      | `Sqrt`     |
/// | `max_depth`         | `None`     |
/// | `min_samples_split` | 2          |
/// | `min_samples_leaf`  | 1          |
/// | `criterion`         | `Gini`     |
/// | `class_weight`      | `Uniform`  |
/// | `seed`              | 42         |
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) criterion: SplitCriterion,
    pub(crate) class_weight: ClassWeight,
    pub(crate) seed: u64,
}

impl RandomForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Gini,
            class_weight: ClassWeight::Uniform,
            seed: 42,
        })
    }

    /// Set the max features strategy.
    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set the maximum tree depth. `None` means unlimited.
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

    /// Set the split quality criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: SplitCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set how samples are weighted by class.
    #[must_use]
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Return the maximum depth limit, if any.
    #[must_use]
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Return the class weighting mode.
    #[must_use]
    pub fn class_weight(&self) -> ClassWeight {
        self.class_weight
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Train a Random Forest on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]` is row-major; `labels[sample_idx]`
    /// indexes into `class_names`, which also fixes the number of classes.
    ///
    /// # Errors
    ///
    /// | Variant                           | When                                             |
    /// |-----------------------------------|--------------------------------------------------|
    /// | [`RfError::EmptyDataset`]         | `features` is empty                              |
    /// | [`RfError::ZeroFeatures`]         | rows have zero feature columns                   |
    /// | [`RfError::FeatureCountMismatch`] | rows have inconsistent lengths                   |
    /// | [`RfError::NonFiniteValue`]       | any value is NaN or infinite                     |
    /// | [`RfError::LabelCountMismatch`]   | `labels.len() != features.len()`                 |
    /// | [`RfError::LabelOutOfRange`]      | a label has no entry in `class_names`            |
    /// | [`RfError::InvalidMaxFeatures`]   | resolved max_features is outside [1, n_features] |
    /// | tree config variants              | invalid depth or leaf-size limits                |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        feature_names: &[String],
        class_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, labels, feature_names, class_names)
    }
}
