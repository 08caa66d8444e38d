//! Training pipeline: load, split, fit, evaluate, persist.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use floodrisk_io::{
    DROPPED_COLUMNS, DatasetReader, IoError, LABEL_COLUMN, prepare_output_path, write_json_report,
};
use floodrisk_rf::{
    AveragedMetrics, ClassMetrics, ClassWeight, EvaluationReport, RandomForest,
    RandomForestConfig, RankedFeature, SplitIndices, StratifiedSplit,
};

/// Default location of the prepared training table.
pub const DEFAULT_DATA_PATH: &str = "data/processed/final_training_data.csv";

/// Default location of the serialized model.
pub const DEFAULT_MODEL_PATH: &str = "data/outputs/model/flood_susceptibility_model.bin";

/// Resolved settings for one training run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Input CSV.
    pub data_path: PathBuf,
    /// Model output file; parent directories are created as needed.
    pub model_path: PathBuf,
    /// Optional JSON evaluation report.
    pub report_path: Option<PathBuf>,
    /// Seed for both the hold-out split and the forest.
    pub seed: u64,
    /// Held-out fraction, in (0, 1).
    pub test_size: f64,
    /// Number of trees.
    pub n_trees: usize,
    /// Depth cap; `None` grows trees until leaves are pure.
    pub max_depth: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            report_path: None,
            seed: 42,
            test_size: 0.3,
            n_trees: 100,
            max_depth: None,
        }
    }
}

/// How a run ended without a fatal error.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The input CSV does not exist; nothing was trained or written.
    DataNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },
    /// A model was fit and evaluated, not yet persisted.
    Trained(Box<TrainingRun>),
}

/// A fitted forest with its hold-out evaluation.
#[derive(Debug)]
pub struct TrainingRun {
    forest: RandomForest,
    report: EvaluationReport,
    summary: TrainingSummary,
}

/// Machine-readable record of a run, used for `--json` and `--report`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub data_path: PathBuf,
    pub model_path: PathBuf,
    pub n_train: usize,
    pub n_test: usize,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
    pub class_weights: Vec<f64>,
    pub accuracy: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub class_metrics: Vec<ClassMetrics>,
    pub macro_avg: AveragedMetrics,
    pub weighted_avg: AveragedMetrics,
    pub importances: Vec<RankedFeature>,
}

/// Load the table, hold out a stratified test set, fit, and evaluate.
///
/// A missing input file is reported as [`PipelineOutcome::DataNotFound`];
/// every other failure is an error.
#[instrument(skip_all, fields(data = %config.data_path.display()))]
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let dataset = match DatasetReader::new(&config.data_path).read() {
        Ok(dataset) => dataset,
        Err(IoError::FileNotFound { path, source }) => {
            error!(path = %path.display(), %source, "training data not found");
            warn!("generate the training table first and place it at the path above");
            return Ok(PipelineOutcome::DataNotFound { path });
        }
        Err(e) => return Err(e).context("failed to read training data"),
    };

    let labels = dataset
        .label_vector(LABEL_COLUMN)
        .context("failed to derive labels")?;
    let features = dataset
        .feature_matrix(&DROPPED_COLUMNS)
        .context("failed to derive features")?;
    info!(
        n_rows = dataset.n_rows(),
        features = ?features.feature_names,
        "features selected for training"
    );

    let split = StratifiedSplit::new(config.test_size)?
        .with_seed(config.seed)
        .split(&labels.labels, labels.class_names.len())
        .context("stratified split failed")?;
    info!(
        n_train = split.train.len(),
        n_test = split.test.len(),
        "data split"
    );

    let train_x = SplitIndices::select(&features.rows, &split.train);
    let train_y = SplitIndices::select(&labels.labels, &split.train);
    let test_x = SplitIndices::select(&features.rows, &split.test);
    let test_y = SplitIndices::select(&labels.labels, &split.test);

    let result = RandomForestConfig::new(config.n_trees)?
        .with_max_depth(config.max_depth)
        .with_class_weight(ClassWeight::Balanced)
        .with_seed(config.seed)
        .fit(&train_x, &train_y, &features.feature_names, &labels.class_names)
        .context("random forest training failed")?;
    info!(n_trees = config.n_trees, "model training complete");

    let predictions = result
        .forest()
        .predict_batch(&test_x)
        .context("prediction on the test set failed")?;
    let report = EvaluationReport::new(&test_y, &predictions, &labels.class_names)
        .context("evaluation failed")?;

    let summary = TrainingSummary {
        data_path: config.data_path.clone(),
        model_path: config.model_path.clone(),
        n_train: split.train.len(),
        n_test: split.test.len(),
        feature_names: features.feature_names,
        class_names: labels.class_names,
        class_weights: result.metadata().class_weights.clone(),
        accuracy: report.accuracy(),
        confusion_matrix: report.confusion_matrix().as_rows().to_vec(),
        class_metrics: report.class_metrics().to_vec(),
        macro_avg: report.macro_avg(),
        weighted_avg: report.weighted_avg(),
        importances: result.importances().to_vec(),
    };

    Ok(PipelineOutcome::Trained(Box::new(TrainingRun {
        forest: result.into_forest(),
        report,
        summary,
    })))
}

impl TrainingRun {
    /// Return the hold-out evaluation.
    pub fn report(&self) -> &EvaluationReport {
        &self.report
    }

    /// Return the serializable run record.
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    /// Write the model, and the JSON report when one was requested.
    #[instrument(skip_all, fields(model = %config.model_path.display()))]
    pub fn persist(&self, config: &PipelineConfig) -> Result<()> {
        save_model(&self.forest, &config.model_path)?;
        if let Some(report_path) = &config.report_path {
            write_json_report(report_path, &self.summary)
                .with_context(|| format!("failed to write report {}", report_path.display()))?;
        }
        Ok(())
    }
}

fn save_model(forest: &RandomForest, path: &Path) -> Result<()> {
    prepare_output_path(path).context("failed to prepare model output directory")?;
    forest
        .save(path)
        .with_context(|| format!("failed to save model to {}", path.display()))?;
    info!(path = %path.display(), "model saved");
    Ok(())
}

impl fmt::Display for TrainingRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report();
        writeln!(
            f,
            "Model Accuracy on Test Set: {:.2}%",
            report.accuracy() * 100.0
        )?;
        writeln!(f)?;
        writeln!(f, "Confusion Matrix:")?;
        write!(f, "{}", report.confusion_matrix())?;
        writeln!(f)?;
        writeln!(f, "Classification Report:")?;
        write!(f, "{report}")
    }
}
