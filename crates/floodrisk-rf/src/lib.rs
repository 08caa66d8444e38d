//! Random Forest classification for flood susceptibility: train, evaluate, persist.
//!
//! Provides CART decision trees with Gini/Entropy criteria and per-class
//! sample weighting, a bootstrap ensemble trained in parallel via rayon,
//! a stratified hold-out split, evaluation metrics, and bincode model
//! serialization.

mod config;
mod confusion;
mod error;
mod forest;
mod holdout;
mod importance;
mod node;
mod predict;
mod report;
mod result;
mod serialize;
mod split;
mod tree;
mod weights;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use forest::RandomForest;
pub use holdout::{SplitIndices, StratifiedSplit};
pub use importance::RankedFeature;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use report::{AveragedMetrics, EvaluationReport};
pub use result::{RandomForestResult, TrainingMetadata};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
pub use weights::ClassWeight;
