//! Processing engine for one aggregation run over a measurement file.
//!
//! Chooses between the single-threaded pass and the parallel chunked pass,
//! drives progress reporting, and returns the sorted summary together with
//! run statistics. No summary is ever produced for a run that failed.

pub mod chunking;
pub mod parallel;

use crate::aggregator::{AggregationState, aggregate_observed};
use crate::config::AggregatorConfig;
use crate::error::{Result, StationError};
use crate::models::{ProcessingStats, StationSummary};
use crate::progress::ProgressObserver;
use crate::source::RecordSource;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tracing::{debug, info};

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    pub summary: StationSummary,
    pub stats: ProcessingStats,
}

/// Aggregates one measurement file
pub struct StationProcessor {
    input_path: PathBuf,
    config: AggregatorConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl StationProcessor {
    /// Create a processor for an existing input file
    pub fn new(input_path: impl Into<PathBuf>) -> Result<Self> {
        let input_path = input_path.into();

        // Surface a missing or unreadable file before any work is scheduled
        std::fs::metadata(&input_path).map_err(|source| {
            StationError::source_unavailable(
                format!("cannot access {}", input_path.display()),
                source,
            )
        })?;

        Ok(Self {
            input_path,
            config: AggregatorConfig::default(),
            observer: None,
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Main processing entry point.
    ///
    /// Runs the chunked parallel pass when more than one worker is configured
    /// and the file is large enough to split; otherwise runs the sequential
    /// pass on a blocking task.
    pub async fn process(&self) -> Result<ProcessingOutcome> {
        self.config.validate()?;
        let start_time = Instant::now();
        let file_len = self.file_len()?;
        let workers = self.config.effective_workers();

        info!(
            "Aggregating {} ({} bytes) with up to {} workers",
            self.input_path.display(),
            file_len,
            workers
        );

        let (state, chunks) =
            if workers > 1 && file_len >= self.config.min_chunk_bytes.saturating_mul(2) {
                let ranges = {
                    let mut file = self.open_input()?;
                    chunking::plan_chunks(&mut file, file_len, workers, self.config.min_chunk_bytes)
                        .map_err(|source| {
                            StationError::source_unavailable(
                                format!("cannot plan chunks for {}", self.input_path.display()),
                                source,
                            )
                        })?
                };
                let state = parallel::aggregate_parallel(
                    &self.input_path,
                    &ranges,
                    &self.config,
                    self.observer.clone(),
                )
                .await?;
                (state, ranges.len())
            } else {
                let path = self.input_path.clone();
                let config = self.config.clone();
                let observer = self.observer.clone();
                let state = task::spawn_blocking(move || {
                    run_sequential(&path, &config, observer.as_deref())
                })
                .await
                .map_err(|join_error| StationError::worker_failed(join_error.to_string()))??;
                (state, 1)
            };

        Ok(self.finish(state, file_len, chunks, workers.min(chunks), start_time))
    }

    /// Single-threaded pass on the calling thread, without a runtime
    pub fn process_blocking(&self) -> Result<ProcessingOutcome> {
        self.config.validate()?;
        let start_time = Instant::now();
        let file_len = self.file_len()?;

        let state = run_sequential(&self.input_path, &self.config, self.observer.as_deref())?;
        Ok(self.finish(state, file_len, 1, 1, start_time))
    }

    fn finish(
        &self,
        state: AggregationState,
        file_len: u64,
        chunks: usize,
        workers: usize,
        start_time: Instant,
    ) -> ProcessingOutcome {
        let records_processed = state.record_count();
        let summary = state.finalize(self.config.rounding);

        let stats = ProcessingStats {
            input_path: self.input_path.clone(),
            records_processed,
            stations: summary.len(),
            bytes_read: file_len,
            chunks,
            workers,
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        info!(
            "Aggregated {} records into {} stations in {}ms",
            stats.records_processed, stats.stations, stats.processing_time_ms
        );

        ProcessingOutcome { summary, stats }
    }

    fn file_len(&self) -> Result<u64> {
        std::fs::metadata(&self.input_path)
            .map(|metadata| metadata.len())
            .map_err(|source| {
                StationError::source_unavailable(
                    format!("cannot access {}", self.input_path.display()),
                    source,
                )
            })
    }

    fn open_input(&self) -> Result<File> {
        File::open(&self.input_path).map_err(|source| {
            StationError::source_unavailable(
                format!("cannot open {}", self.input_path.display()),
                source,
            )
        })
    }
}

fn run_sequential(
    path: &Path,
    config: &AggregatorConfig,
    observer: Option<&dyn ProgressObserver>,
) -> Result<AggregationState> {
    debug!("Running sequential pass over {}", path.display());
    let mut source = RecordSource::open(path, config.read_buffer_size)?;
    aggregate_observed(
        &mut source,
        AggregationState::with_capacity(config.station_capacity),
        observer,
        config.progress_interval,
    )
}

#[cfg(test)]
mod tests;
