//! Accuracy regression tests for floodrisk-rf.
//!
//! These tests verify that algorithmic changes do not degrade hold-out
//! accuracy on a deterministic, imbalanced synthetic flood dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use floodrisk_rf::{ClassWeight, EvaluationReport, RandomForestConfig, SplitIndices, StratifiedSplit};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic flood-susceptibility dataset
// ---------------------------------------------------------------------------

/// Generate 1000 points, 700 dry (class 0) and 300 flooded (class 1).
///
/// `elevation` and `distance_to_river` are informative with an overlap band;
/// `aspect`, `ndvi_noise` and `soil_noise` carry no signal.
fn make_flood_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut features = Vec::with_capacity(1000);
    let mut labels = Vec::with_capacity(1000);
    for i in 0..1000 {
        let flooded = i % 10 >= 7;
        let (elev_lo, elev_span, dist_lo, dist_span) = if flooded {
            (0.0, 50.0, 0.0, 600.0)
        } else {
            (40.0, 60.0, 300.0, 700.0)
        };
        features.push(vec![
            elev_lo + rng.r#gen::<f64>() * elev_span,
            dist_lo + rng.r#gen::<f64>() * dist_span,
            rng.r#gen::<f64>() * 360.0,
            rng.r#gen::<f64>(),
            rng.r#gen::<f64>() * 10.0,
        ]);
        labels.push(usize::from(flooded));
    }
    let feature_names = ["elevation", "distance_to_river", "aspect", "ndvi_noise", "soil_noise"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let class_names = vec!["0".to_string(), "1".to_string()];
    (features, labels, feature_names, class_names)
}

fn run_holdout(class_weight: ClassWeight) -> EvaluationReport {
    let (features, labels, feature_names, class_names) = make_flood_data();
    let split = StratifiedSplit::new(0.3).unwrap().split(&labels, 2).unwrap();

    let train_x = SplitIndices::select(&features, &split.train);
    let train_y = SplitIndices::select(&labels, &split.train);
    let test_x = SplitIndices::select(&features, &split.test);
    let test_y = SplitIndices::select(&labels, &split.test);

    let forest = RandomForestConfig::new(100)
        .unwrap()
        .with_class_weight(class_weight)
        .with_seed(42)
        .fit(&train_x, &train_y, &feature_names, &class_names)
        .unwrap()
        .into_forest();
    let predictions = forest.predict_batch(&test_x).unwrap();
    EvaluationReport::new(&test_y, &predictions, &class_names).unwrap()
}

// ---------------------------------------------------------------------------
// a) holdout_accuracy_above_threshold
// ---------------------------------------------------------------------------

/// Balanced 100-tree forest must exceed 0.85 accuracy on the 30% hold-out.
#[test]
fn holdout_accuracy_above_threshold() {
    let report = run_holdout(ClassWeight::Balanced);
    assert_eq!(report.confusion_matrix().total(), 300);
    assert!(report.accuracy() > 0.85, "accuracy {} <= 0.85", report.accuracy());
}

// ---------------------------------------------------------------------------
// b) minority_recall_with_balanced_weights
// ---------------------------------------------------------------------------

/// Flooded points are the minority; balanced weighting must still recover most of them.
#[test]
fn minority_recall_with_balanced_weights() {
    let report = run_holdout(ClassWeight::Balanced);
    let flooded = &report.class_metrics()[1];
    assert_eq!(flooded.support, 90);
    assert!(flooded.recall > 0.75, "flooded recall {} <= 0.75", flooded.recall);
}

// ---------------------------------------------------------------------------
// c) informative_features_ranked_first
// ---------------------------------------------------------------------------

#[test]
fn informative_features_ranked_first() {
    let (features, labels, feature_names, class_names) = make_flood_data();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_class_weight(ClassWeight::Balanced)
        .fit(&features, &labels, &feature_names, &class_names)
        .unwrap();

    let top2: Vec<&str> = result.importances().iter().take(2).map(|f| f.name.as_str()).collect();
    assert!(top2.contains(&"elevation"), "top-2: {top2:?}");
    assert!(top2.contains(&"distance_to_river"), "top-2: {top2:?}");
}

// ---------------------------------------------------------------------------
// d) repeated_runs_are_identical
// ---------------------------------------------------------------------------

/// Same seeds must give the same accuracy and confusion matrix.
#[test]
fn repeated_runs_are_identical() {
    let first = run_holdout(ClassWeight::Balanced);
    let second = run_holdout(ClassWeight::Balanced);
    assert_eq!(first.confusion_matrix(), second.confusion_matrix());
    assert_eq!(first.accuracy().to_bits(), second.accuracy().to_bits());
}
