//! Configuration management and validation.
//!
//! Provides configuration structures for aggregation runs and for the
//! synthetic measurement generator. Values start from defaults, are
//! overridden from the command line, then validated once.

use crate::constants::{
    COLDEST_TEMPERATURE, DEFAULT_GENERATOR_BATCH_SIZE, DEFAULT_MEASUREMENTS_PATH,
    DEFAULT_MIN_CHUNK_BYTES, DEFAULT_PROGRESS_INTERVAL, DEFAULT_READ_BUFFER_SIZE,
    DEFAULT_RECORD_COUNT, DEFAULT_STATION_CAPACITY, DEFAULT_STATIONS_PATH, HOTTEST_TEMPERATURE,
};
use crate::error::{Result, StationError};
use crate::models::RoundingMode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// System profiling information used to size the worker pool
#[derive(Debug, Clone)]
pub struct SystemProfile {
    /// Number of logical CPU cores available
    pub cpu_cores: usize,
    /// Physical cores (excludes hyper-threads)
    pub performance_cores: usize,
}

impl SystemProfile {
    /// Auto-detect system capabilities
    pub fn detect() -> Self {
        Self {
            cpu_cores: num_cpus::get(),
            performance_cores: num_cpus::get_physical(),
        }
    }
}

/// Settings for one aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of parallel workers (0 = one per logical core)
    pub workers: usize,

    /// Buffer capacity of each record source in bytes
    pub read_buffer_size: usize,

    /// Smallest byte range given to a single worker
    pub min_chunk_bytes: u64,

    /// Records between progress notifications
    pub progress_interval: u64,

    /// Rounding rule for the formatted output
    pub rounding: RoundingMode,

    /// Initial station map capacity per worker
    pub station_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            min_chunk_bytes: DEFAULT_MIN_CHUNK_BYTES,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            rounding: RoundingMode::default(),
            station_capacity: DEFAULT_STATION_CAPACITY,
        }
    }
}

impl AggregatorConfig {
    /// Force the single-threaded pass
    pub fn sequential() -> Self {
        Self::default().with_workers(1)
    }

    /// Create configuration with custom worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_read_buffer_size(mut self, read_buffer_size: usize) -> Self {
        self.read_buffer_size = read_buffer_size;
        self
    }

    pub fn with_min_chunk_bytes(mut self, min_chunk_bytes: u64) -> Self {
        self.min_chunk_bytes = min_chunk_bytes;
        self
    }

    pub fn with_progress_interval(mut self, progress_interval: u64) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_station_capacity(mut self, station_capacity: usize) -> Self {
        self.station_capacity = station_capacity;
        self
    }

    /// Resolve the worker count, detecting cores when set to auto
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }

        let profile = SystemProfile::detect();
        debug!(
            "Auto-detected {} logical cores ({} physical)",
            profile.cpu_cores, profile.performance_cores
        );
        profile.cpu_cores.max(1)
    }

    /// Reject values that would stall or corrupt a run
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(StationError::configuration(
                "read_buffer_size must be greater than zero",
            ));
        }
        if self.min_chunk_bytes == 0 {
            return Err(StationError::configuration(
                "min_chunk_bytes must be greater than zero",
            ));
        }
        if self.progress_interval == 0 {
            return Err(StationError::configuration(
                "progress_interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Settings for the synthetic measurement generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Station list to draw names from
    pub stations_path: PathBuf,

    /// Measurement file to create (parent directories are created)
    pub output_path: PathBuf,

    /// Number of records to write
    pub num_records: u64,

    /// Records rendered per write call
    pub batch_size: usize,

    /// Lowest generated temperature
    pub coldest: f64,

    /// Highest generated temperature
    pub hottest: f64,

    /// Fixed seed for reproducible files
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            stations_path: PathBuf::from(DEFAULT_STATIONS_PATH),
            output_path: PathBuf::from(DEFAULT_MEASUREMENTS_PATH),
            num_records: DEFAULT_RECORD_COUNT,
            batch_size: DEFAULT_GENERATOR_BATCH_SIZE,
            coldest: COLDEST_TEMPERATURE,
            hottest: HOTTEST_TEMPERATURE,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn with_num_records(mut self, num_records: u64) -> Self {
        self.num_records = num_records;
        self
    }

    pub fn with_stations_path(mut self, stations_path: impl Into<PathBuf>) -> Self {
        self.stations_path = stations_path.into();
        self
    }

    pub fn with_output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_records == 0 {
            return Err(StationError::configuration(
                "num_records must be a positive integer",
            ));
        }
        if self.batch_size == 0 {
            return Err(StationError::configuration(
                "batch_size must be greater than zero",
            ));
        }
        if !(self.coldest.is_finite() && self.hottest.is_finite()) || self.coldest > self.hottest
        {
            return Err(StationError::configuration(format!(
                "invalid temperature range {}..={}",
                self.coldest, self.hottest
            )));
        }
        Ok(())
    }
}
