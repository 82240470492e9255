//! Command-line argument definitions for the station summary tool
//!
//! Defines the CLI interface using the clap derive API.

use crate::config::{AggregatorConfig, GeneratorConfig};
use crate::constants::{
    DEFAULT_GENERATOR_BATCH_SIZE, DEFAULT_MEASUREMENTS_PATH, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_STATIONS_PATH,
};
use crate::generator::parse_record_count;
use crate::models::RoundingMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the station summary tool
///
/// Computes per-station min/mean/max temperatures from very large
/// `station;temperature` files and generates synthetic test files.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "station-summary",
    version,
    about = "Per-station min/mean/max aggregation of station;temperature measurement files",
    long_about = "Reads a measurement file with one `station;temperature` record per line and \
                  prints the minimum, mean and maximum temperature of every station in \
                  alphabetical order. Large files are split into line-aligned chunks and \
                  aggregated in parallel."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Aggregate a measurement file into per-station min/mean/max
    Aggregate(AggregateArgs),
    /// Generate a synthetic measurement file
    Generate(GenerateArgs),
}

/// How the summary is printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `{Oslo=-3.5/-3.5/-3.5, Rome=12.0/13.0/14.0}`
    Braces,
    /// One `station=min/mean/max` line per station
    Lines,
}

/// Arguments for the aggregate command
#[derive(Debug, Clone, Parser)]
pub struct AggregateArgs {
    /// Measurement file to aggregate
    #[arg(value_name = "INPUT", default_value = DEFAULT_MEASUREMENTS_PATH)]
    pub input_path: PathBuf,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(
        short = 'j',
        long = "workers",
        default_value = "0",
        help = "Number of parallel workers (0 = number of CPU cores)"
    )]
    pub workers: usize,

    /// Rounding applied to the printed tenths
    #[arg(long = "rounding", value_enum, default_value_t = RoundingMode::HalfAwayFromZero)]
    pub rounding: RoundingMode,

    /// Records between progress updates
    #[arg(long = "progress-interval", default_value_t = DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: u64,

    /// Output layout for the summary
    #[arg(long = "format", value_enum, default_value = "braces")]
    pub format: OutputFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress progress and summary statistics
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except results and errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Arguments for the generate command
#[derive(Debug, Clone, Parser)]
pub struct GenerateArgs {
    /// Number of records to write, underscores allowed (e.g. 1_000_000)
    #[arg(value_name = "NUM_RECORDS", value_parser = parse_record_count)]
    pub num_records: u64,

    /// Station list, one `name;...` entry per line
    #[arg(long = "stations", default_value = DEFAULT_STATIONS_PATH)]
    pub stations_path: PathBuf,

    /// Output measurement file
    #[arg(short = 'o', long = "output", default_value = DEFAULT_MEASUREMENTS_PATH)]
    pub output_path: PathBuf,

    /// Records written per batch
    #[arg(long = "batch-size", default_value_t = DEFAULT_GENERATOR_BATCH_SIZE)]
    pub batch_size: usize,

    /// Seed for a reproducible file
    #[arg(long = "seed")]
    pub seed: Option<u64>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress the progress bar
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Map `-v` counts and `-q` onto a tracing level
pub fn get_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl AggregateArgs {
    pub fn get_log_level(&self) -> &'static str {
        get_log_level(self.verbose, self.quiet)
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Layer the command-line overrides onto the default configuration
    pub fn to_config(&self) -> AggregatorConfig {
        AggregatorConfig::default()
            .with_workers(self.workers)
            .with_rounding(self.rounding)
            .with_progress_interval(self.progress_interval)
    }
}

impl GenerateArgs {
    pub fn get_log_level(&self) -> &'static str {
        get_log_level(self.verbose, self.quiet)
    }

    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    pub fn to_config(&self) -> GeneratorConfig {
        let config = GeneratorConfig::default()
            .with_num_records(self.num_records)
            .with_stations_path(&self.stations_path)
            .with_output_path(&self.output_path)
            .with_batch_size(self.batch_size);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}
