//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) class_names: Vec<String>,
}

/// Check a row-major matrix and return its feature count.
pub(crate) fn validate_features(features: &[Vec<f64>]) -> Result<usize, RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Resolve `MaxFeatures` to a concrete count, rounding down to at least 1.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().floor().max(1.0) as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().floor().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).floor().max(1.0) as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Draw `n_samples` indices with replacement.
fn bootstrap_indices(n_samples: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    feature_names: &[String],
    class_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let n_features = validate_features(features)?;
    let n_samples = features.len();
    if labels.len() != n_samples {
        return Err(RfError::LabelCountMismatch {
            n_samples,
            n_labels: labels.len(),
        });
    }
    let n_classes = class_names.len();
    if let Some((sample_index, &label)) =
        labels.iter().enumerate().find(|&(_, &l)| l >= n_classes)
    {
        return Err(RfError::LabelOutOfRange {
            label,
            sample_index,
            n_classes,
        });
    }

    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;
    let class_weights = config.class_weight.resolve(labels, n_classes);

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        class_weight = ?config.class_weight,
        "training random forest"
    );
    debug!(?class_weights, "resolved class weights");

    // Seeds are drawn up front so results do not depend on thread scheduling.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let tree_template = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved))
        .with_n_classes(Some(n_classes));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let drawn = bootstrap_indices(n_samples, &mut rng);

            let boot_features: Vec<Vec<f64>> =
                drawn.iter().map(|&i| features[i].clone()).collect();
            let boot_labels: Vec<usize> = drawn.iter().map(|&i| labels[i]).collect();
            let boot_weights: Vec<f64> =
                boot_labels.iter().map(|&l| class_weights[l]).collect();

            tree_template
                .clone()
                .with_seed(rng.r#gen())
                .fit_weighted(&boot_features, &boot_labels, &boot_weights)
        })
        .collect::<Result<_, _>>()?;

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
        class_names: class_names.to_vec(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved,
        class_weights,
    };

    info!("random forest training complete");

    Ok(RandomForestResult::new(forest, importances, metadata))
}
