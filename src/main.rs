mod pipeline;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use pipeline::{DEFAULT_DATA_PATH, DEFAULT_MODEL_PATH, PipelineConfig, PipelineOutcome};

#[derive(Parser)]
#[command(name = "floodrisk")]
#[command(about = "Train and evaluate a flood susceptibility random forest")]
#[command(version)]
struct Cli {
    /// Path to the training CSV (feature columns plus `Class`)
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Where to write the trained model
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    model_out: PathBuf,

    /// Write the evaluation summary as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// RNG seed for the split and the forest
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Fraction of samples held out for testing
    #[arg(long, default_value_t = 0.3)]
    test_size: f64,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print a JSON summary to stdout instead of the text report
    #[arg(long)]
    json: bool,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            data_path: self.data.clone(),
            model_path: self.model_out.clone(),
            report_path: self.report.clone(),
            seed: self.seed,
            test_size: self.test_size,
            n_trees: self.n_trees,
            max_depth: self.max_depth,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let config = cli.pipeline_config();
    info!("starting flood susceptibility model training");

    let run = match pipeline::run(&config)? {
        PipelineOutcome::DataNotFound { .. } => return Ok(()),
        PipelineOutcome::Trained(run) => run,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(run.summary())?);
    } else {
        print!("{run}");
    }

    run.persist(&config)?;
    info!("process finished");
    Ok(())
}
