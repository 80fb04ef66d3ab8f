use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use phenocast_io::{
    DecompositionReader, EvaluationReport, ExperimentName, ObservationReader, ProductivityReader,
    QualityReader, ResultWriter, align,
};
use phenocast_rf::{AdaptiveEvaluator, GridSearch, ModelSpec, ParamGrid};
use phenocast_series::{AggregationConfig, DecompositionConfig, DecompositionMode, fill_gaps};

const OBSERVATIONS_FILE: &str = "ndvi_timeseries.csv";
const QUALITY_FILE: &str = "quality_flags.csv";
const PRODUCTIVITY_FILE: &str = "productivity_history.csv";

#[derive(Parser)]
#[command(name = "phenocast")]
#[command(about = "NDVI seasonal decomposition and size-adaptive productivity regression")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Aggregation and decomposition parameters.
#[derive(Args, Debug, Clone)]
struct PreprocessArgs {
    /// Minimum quality score for an observation to be kept
    #[arg(long, default_value_t = 0.8)]
    quality_threshold: f64,

    /// Seasonal period in days
    #[arg(long, default_value_t = 46)]
    period: usize,

    /// Decomposition model: "additive" or "multiplicative"
    #[arg(long, default_value = "additive")]
    model: String,
}

/// Model and search parameters.
#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// Experiment name for the report file (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "phenocast")]
    experiment: String,

    /// Number of trees in the base model
    #[arg(long, default_value_t = 100)]
    n_estimators: usize,

    /// Maximum tree depth of the base model (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Skip the hyperparameter grid search
    #[arg(long, default_value_t = false)]
    no_search: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Aggregate raw observations, fill gaps, and decompose the daily series
    Preprocess {
        /// Directory holding ndvi_timeseries.csv and quality_flags.csv
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory for ndvi_clean.csv and decomposition.csv
        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        preprocess: PreprocessArgs,
    },

    /// Align a decomposition with productivity, evaluate, and search hyperparameters
    Train {
        /// Directory holding decomposition.csv
        #[arg(long)]
        processed_dir: PathBuf,

        /// Directory holding productivity_history.csv
        #[arg(long)]
        raw_dir: PathBuf,

        /// Directory for the evaluation report (defaults to the processed directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        #[command(flatten)]
        train: TrainArgs,
    },

    /// Preprocess then train in one pass
    Run {
        /// Directory holding the three raw CSV inputs
        #[arg(long)]
        input_dir: PathBuf,

        /// Directory for all outputs
        #[arg(long)]
        output_dir: PathBuf,

        #[command(flatten)]
        preprocess: PreprocessArgs,

        #[command(flatten)]
        train: TrainArgs,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct PreprocessOutput {
    n_observations: usize,
    n_flags: usize,
    n_below_threshold: usize,
    n_aggregated_dates: usize,
    n_inserted_dates: usize,
    n_filled: usize,
    n_days: usize,
    period: usize,
    model: String,
    clean_series: PathBuf,
    decomposition: PathBuf,
}

fn parse_mode(s: &str) -> Result<DecompositionMode> {
    match s {
        "additive" => Ok(DecompositionMode::Additive),
        "multiplicative" => Ok(DecompositionMode::Multiplicative),
        other => anyhow::bail!("unknown decomposition model: {other} (expected additive or multiplicative)"),
    }
}

fn preprocess(input_dir: &Path, output_dir: &Path, args: &PreprocessArgs) -> Result<PreprocessOutput> {
    let aggregation = AggregationConfig::new(args.quality_threshold)?;
    let decomposition_config = DecompositionConfig::new(args.period)?.with_mode(parse_mode(&args.model)?);

    // 1. Read raw inputs
    let observations = ObservationReader::new(&input_dir.join(OBSERVATIONS_FILE))
        .read()
        .context("failed to read observations CSV")?;
    let flags = QualityReader::new(&input_dir.join(QUALITY_FILE))
        .read()
        .context("failed to read quality flags CSV")?;

    // 2. Aggregate, fill gaps, decompose
    let (series, aggregation_summary) = aggregation
        .aggregate(&observations, &flags)
        .context("quality-gated aggregation failed")?;
    let (filled, fill_summary) = fill_gaps(&series);
    if fill_summary.n_unfilled > 0 {
        warn!(n_unfilled = fill_summary.n_unfilled, "some dates could not be interpolated");
    }
    let decomposition = decomposition_config
        .decompose(&filled)
        .context("seasonal decomposition failed")?;
    info!(
        n_days = decomposition.len(),
        period = decomposition.period(),
        mode = %decomposition.mode(),
        "preprocessing complete"
    );

    // 3. Write processed outputs
    let writer = ResultWriter::new(output_dir, ExperimentName::default())?;
    let clean_series = writer.write_daily_series(&filled)?;
    let decomposition_path = writer.write_decomposition(&decomposition)?;

    Ok(PreprocessOutput {
        n_observations: observations.len(),
        n_flags: flags.len(),
        n_below_threshold: aggregation_summary.n_below_threshold,
        n_aggregated_dates: aggregation_summary.n_dates,
        n_inserted_dates: fill_summary.n_inserted_dates,
        n_filled: fill_summary.n_filled,
        n_days: decomposition.len(),
        period: decomposition.period(),
        model: decomposition.mode().to_string(),
        clean_series,
        decomposition: decomposition_path,
    })
}

fn train(
    decomposition_path: &Path,
    productivity_path: &Path,
    output_dir: &Path,
    args: &TrainArgs,
    seed: u64,
) -> Result<EvaluationReport> {
    let experiment = ExperimentName::new(args.experiment.clone())?;
    let evaluator = AdaptiveEvaluator::new(ModelSpec {
        n_estimators: args.n_estimators,
        max_depth: args.max_depth,
        seed,
    })?;

    // 1. Read processed decomposition and productivity, then align
    let records = DecompositionReader::new(decomposition_path)
        .read()
        .context("failed to read decomposition CSV")?;
    let productivity = ProductivityReader::new(productivity_path)
        .read()
        .context("failed to read productivity CSV")?;
    let aligned = align(&records, &productivity)
        .context("failed to align decomposition with productivity")?;

    // 2. Base evaluation
    let base = evaluator
        .evaluate(aligned.features(), aligned.targets(), aligned.feature_names())
        .context("base evaluation failed")?;

    // 3. Grid search
    let search = if args.no_search {
        info!("hyperparameter search disabled");
        None
    } else {
        let outcome = GridSearch::new(ParamGrid::default())
            .run(
                aligned.features(),
                aligned.targets(),
                aligned.feature_names(),
                &base.split,
                seed,
            )
            .context("hyperparameter search failed")?;
        Some(outcome)
    };

    let report = EvaluationReport::new(experiment.as_str(), &base, search.as_ref());
    for diagnostic in &report.diagnostics {
        warn!(%diagnostic, "evaluation diagnostic");
    }

    // 4. Write report JSON
    let writer = ResultWriter::new(output_dir, experiment)?;
    writer.write_report(&report)?;
    Ok(report)
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

    match cli.command {
        Command::Preprocess {
            input_dir,
            output_dir,
            preprocess: args,
        } => {
            let output = preprocess(&input_dir, &output_dir, &args)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train {
            processed_dir,
            raw_dir,
            output_dir,
            train: args,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| processed_dir.clone());
            let report = train(
                &processed_dir.join(phenocast_io::DECOMPOSITION_FILE),
                &raw_dir.join(PRODUCTIVITY_FILE),
                &output_dir,
                &args,
                cli.seed,
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Run {
            input_dir,
            output_dir,
            preprocess: preprocess_args,
            train: train_args,
        } => {
            let preprocessed = preprocess(&input_dir, &output_dir, &preprocess_args)?;
            let report = train(
                &preprocessed.decomposition,
                &input_dir.join(PRODUCTIVITY_FILE),
                &output_dir,
                &train_args,
                cli.seed,
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
