//! Command-line interface components.

use crate::config::{CompressionAlgorithm, ExtractionMode, ProcessorConfig};
use crate::constants::DEFAULT_OUTPUT_FILE;
use crate::models::RunReport;
use crate::processor::VisitProcessor;
use crate::regions::RegionCatalog;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "ais_processor")]
#[command(about = "Extract first port visits per vessel from AIS position report archives")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Directory holding the AIS_YYYY_MM_DD.csv archives
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Output Parquet file (defaults to INPUT_DIR/port_visits.parquet)
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,

    /// Degrees added to each side of every port area
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Maximum position reports per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Archives processed concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Earliest archive date to include (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Latest archive date to include (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Record only the first arrival, never a departure
    #[arg(long)]
    pub first_arrival_only: bool,

    /// Keep visits outside every known port in the output
    #[arg(long)]
    pub include_unknown: bool,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn get_log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Get the output path, defaulting to a file inside the input directory
    pub fn get_output_path(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.input_dir.join(DEFAULT_OUTPUT_FILE))
    }

    /// Build the run configuration, starting from defaults
    pub fn to_config(&self) -> Result<ProcessorConfig> {
        let compression: CompressionAlgorithm = self
            .compression
            .parse()
            .context("Invalid --compression value")?;

        let mut config = ProcessorConfig::default()
            .with_compression(compression)
            .with_include_unknown(self.include_unknown);

        if let Some(tolerance) = self.tolerance {
            config = config.with_tolerance(tolerance);
        }
        if let Some(batch_size) = self.batch_size {
            config = config.with_batch_size(batch_size);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if self.first_arrival_only {
            config = config.with_extraction_mode(ExtractionMode::FirstArrival);
        }
        if self.no_progress {
            config = config.without_progress();
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

/// Initialise tracing on stderr; `RUST_LOG` overrides the verbosity flag
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ais_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialise logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Run a full extraction for the parsed arguments
pub async fn run(args: Args, cancel: CancellationToken) -> Result<RunReport> {
    setup_logging(&args)?;

    let config = args.to_config()?;
    let output_path = args.get_output_path();

    print_header(&args.input_dir, &output_path, &config);

    let processor = VisitProcessor::new(config, RegionCatalog::us_ports())
        .context("Failed to create visit processor")?;

    let report = processor
        .process_directory(&args.input_dir, (args.start, args.end), &output_path, &cancel)
        .await
        .with_context(|| format!("Failed to process {}", args.input_dir.display()))?;

    print_summary(&report);
    Ok(report)
}

fn print_header(input_dir: &Path, output_path: &Path, config: &ProcessorConfig) {
    println!("{}", "Starting AIS port visit extraction".bright_green().bold());
    println!("  {} {}", "Input:".bright_cyan(), input_dir.display());
    println!("  {} {}", "Output:".bright_cyan(), output_path.display());
    println!(
        "  {} {:.2}°",
        "Tolerance:".bright_cyan(),
        config.tolerance_degrees
    );
    println!("  {} {:?}", "Mode:".bright_cyan(), config.extraction_mode);
    println!();
}

/// Print the colored end-of-run summary
pub fn print_summary(report: &RunReport) {
    let stats = &report.stats;

    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms
    );
    println!(
        "  {} {}",
        "Archives processed:".bright_cyan(),
        stats.archives_processed
    );
    if stats.archives_failed > 0 {
        println!(
            "  {} {}",
            "Archives failed:".bright_red(),
            stats.archives_failed
        );
    }
    if stats.batches_failed > 0 {
        println!(
            "  {} {}",
            "Batches failed:".bright_red(),
            stats.batches_failed
        );
    }
    println!(
        "  {} {} of {}",
        "Reports retained:".bright_cyan(),
        stats.rows_retained,
        stats.rows_read
    );
    println!(
        "  {} {}",
        "Port visits:".bright_cyan(),
        report.visits.len()
    );
    if let Some(path) = &report.output_path {
        println!("  {} {}", "Written to:".bright_cyan(), path.display());
    }

    if !report.skipped.is_empty() {
        println!("\n{}", "Skipped".bright_yellow());
        for unit in &report.skipped {
            println!("  {} {}", "-".bright_yellow(), unit);
        }
    }
}
