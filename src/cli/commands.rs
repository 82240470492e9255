//! Command implementations for the station summary CLI
//!
//! Sets up logging, layers arguments onto configuration, runs the library
//! operation with progress reporting and prints results. Results go to
//! stdout; progress, statistics and logs go to stderr.

use crate::cli::args::{AggregateArgs, Args, Commands, GenerateArgs, OutputFormat};
use crate::generator::{self, format_bytes, format_elapsed};
use crate::models::{ProcessingStats, StationSummary};
use crate::processor::StationProcessor;
use crate::progress::{ProgressObserver, ProgressReporter};
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Dispatch the parsed command line
pub async fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Aggregate(aggregate_args)) => run_aggregate(aggregate_args).await,
        Some(Commands::Generate(generate_args)) => run_generate(generate_args).await,
        None => Ok(()),
    }
}

/// Set up tracing for the CLI, honouring `RUST_LOG` when present
fn setup_logging(log_level: &str, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("station_summary={}", log_level)));

    // try_init leaves an already installed subscriber in place
    let result = if quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
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
    };

    if result.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}

async fn run_aggregate(args: AggregateArgs) -> Result<()> {
    setup_logging(args.get_log_level(), args.quiet);
    debug!("Command line arguments: {:?}", args);

    let config = args.to_config();
    config.validate().context("invalid aggregation settings")?;

    let reporter = Arc::new(if args.show_progress() {
        ProgressReporter::records("Aggregating measurements")
    } else {
        ProgressReporter::hidden()
    });
    let observer: Arc<dyn ProgressObserver> = reporter.clone();

    let processor = StationProcessor::new(&args.input_path)
        .with_context(|| format!("cannot aggregate {}", args.input_path.display()))?
        .with_config(config)
        .with_observer(observer);

    let outcome = match processor.process().await {
        Ok(outcome) => outcome,
        Err(error) => {
            reporter.finish_with_error(&error.to_string());
            return Err(error)
                .with_context(|| format!("aggregation of {} failed", args.input_path.display()));
        }
    };
    reporter.finish("Aggregation complete");

    print_summary(&outcome.summary, args.format).context("cannot write results")?;
    if args.show_progress() {
        print_processing_stats(&outcome.stats);
    }
    Ok(())
}

fn print_summary(summary: &StationSummary, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Braces => writeln!(out, "{}", summary)?,
        OutputFormat::Lines => write!(out, "{}", summary.to_lines())?,
    }
    out.flush()
}

fn print_processing_stats(stats: &ProcessingStats) {
    eprintln!("\n{}", "Aggregation Summary".bright_green().bold());
    eprintln!("  Input: {}", stats.input_path.display());
    eprintln!(
        "  Records: {}",
        stats.records_processed.to_string().bright_white().bold()
    );
    eprintln!(
        "  Stations: {}",
        stats.stations.to_string().bright_white().bold()
    );
    eprintln!("  Bytes read: {}", format_bytes(stats.bytes_read));
    eprintln!("  Chunks: {} on {} workers", stats.chunks, stats.workers);
    eprintln!(
        "  Time: {} ({:.0} records/s)",
        format_elapsed(Duration::from_millis(stats.processing_time_ms as u64)),
        stats.throughput()
    );
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    setup_logging(args.get_log_level(), args.quiet);
    debug!("Command line arguments: {:?}", args);

    let config = args.to_config();
    config.validate().context("invalid generator settings")?;

    let names = generator::load_station_names(&config.stations_path)
        .with_context(|| format!("cannot use station list {}", config.stations_path.display()))?;
    let estimate = generator::estimate_file_size(&names, config.num_records);
    if args.show_progress() {
        eprintln!(
            "Estimated file size: {} (the final size will probably be smaller)",
            format_bytes(estimate).bright_white().bold()
        );
    }
    info!(
        "Generating {} records from {} stations",
        config.num_records,
        names.len()
    );

    let reporter = if args.show_progress() {
        ProgressReporter::bounded(config.num_records, "Writing measurements")
    } else {
        ProgressReporter::hidden()
    };

    // The generator is synchronous file I/O, so keep it off the async workers
    let task_reporter = Arc::new(reporter);
    let worker_reporter = Arc::clone(&task_reporter);
    let worker_config = config.clone();
    let result = tokio::task::spawn_blocking(move || {
        generator::generate_with_names(&worker_config, names, Some(worker_reporter.as_ref()))
    })
    .await
    .context("generator task failed")?;

    let stats = match result {
        Ok(stats) => stats,
        Err(error) => {
            task_reporter.finish_with_error(&error.to_string());
            return Err(error).with_context(|| {
                format!("cannot generate {}", config.output_path.display())
            });
        }
    };
    task_reporter.finish("Generation complete");

    if args.show_progress() {
        eprintln!(
            "\n{} {} records ({}) written to {}",
            "Done:".bright_green().bold(),
            stats.records_written,
            format_bytes(stats.bytes_written),
            stats.output_path.display()
        );
        eprintln!("Elapsed time: {}", format_elapsed(stats.elapsed));
    }
    Ok(())
}
