//! Feature importance aggregation across trees.

/// A feature with its forest-wide importance and rank.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFeature {
    /// Feature column name.
    pub name: String,
    /// Normalized Mean Decrease in Impurity (sums to 1.0 across features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Sum per-tree MDI vectors, normalize, and rank descending.
///
/// Ties keep column order, so the ranking is stable across runs.
pub(crate) fn aggregate_importances(
    per_tree: &[Vec<f64>],
    names: &[String],
) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return vec![];
    }

    let mut totals = vec![0.0f64; names.len()];
    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .map(|(name, importance)| RankedFeature {
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::aggregate_importances;

    #[test]
    fn ranks_by_summed_importance() {
        let per_tree = vec![vec![0.2, 0.8, 0.0], vec![0.6, 0.4, 0.0]];
        let names: Vec<String> = ["slope", "elevation", "ndvi"].iter().map(|s| s.to_string()).collect();
        let ranked = aggregate_importances(&per_tree, &names);

        assert_eq!(ranked[0].name, "elevation");
        assert_eq!(ranked[0].rank, 1);
        assert!((ranked[0].importance - 0.6).abs() < 1e-12);
        assert_eq!(ranked[2].name, "ndvi");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(aggregate_importances(&[], &["x".to_string()]).is_empty());
    }
}
