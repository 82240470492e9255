//! Parallel aggregation over line-aligned byte ranges
//!
//! Each range runs on its own blocking task with a private file handle and a
//! private [`AggregationState`]. Workers share only the index of the lowest
//! failed chunk, so chunks after a failure stop early; the coordinator merges
//! their states in chunk order once all have finished.

use crate::aggregator::{AggregationState, aggregate_until};
use crate::config::AggregatorConfig;
use crate::error::{Result, StationError};
use crate::processor::chunking::{ByteRange, count_lines_before};
use crate::progress::ProgressObserver;
use crate::source::RecordSource;

use futures::future::join_all;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::task;
use tracing::{debug, error};

/// Lowest index of a chunk that has failed, shared by all workers
#[derive(Debug)]
pub struct FailureMarker {
    lowest: AtomicUsize,
}

impl FailureMarker {
    pub fn new() -> Self {
        Self {
            lowest: AtomicUsize::new(usize::MAX),
        }
    }

    /// Record that chunk `index` failed
    pub fn fail(&self, index: usize) {
        self.lowest.fetch_min(index, Ordering::AcqRel);
    }

    /// A chunk may stop once an earlier chunk has failed; its result can no
    /// longer be reported. Earlier chunks keep running to find earlier errors.
    pub fn should_stop(&self, index: usize) -> bool {
        self.lowest.load(Ordering::Acquire) < index
    }

    pub fn lowest_failed(&self) -> Option<usize> {
        match self.lowest.load(Ordering::Acquire) {
            usize::MAX => None,
            index => Some(index),
        }
    }
}

impl Default for FailureMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate one byte range of the input with a private file handle.
///
/// Line numbers in errors are relative to the start of the range. Returns
/// `Ok(None)` when the range was abandoned because an earlier chunk failed.
pub fn aggregate_range(
    path: &Path,
    range: ByteRange,
    config: &AggregatorConfig,
    observer: Option<&dyn ProgressObserver>,
    failures: &FailureMarker,
) -> Result<Option<AggregationState>> {
    let result = read_range(path, range, config, observer, failures);
    if result.is_err() {
        failures.fail(range.index);
    }
    result
}

fn read_range(
    path: &Path,
    range: ByteRange,
    config: &AggregatorConfig,
    observer: Option<&dyn ProgressObserver>,
    failures: &FailureMarker,
) -> Result<Option<AggregationState>> {
    let mut file = File::open(path).map_err(|source| {
        StationError::source_unavailable(format!("cannot open {}", path.display()), source)
    })?;
    file.seek(SeekFrom::Start(range.start)).map_err(|source| {
        StationError::source_unavailable(
            format!("cannot seek to byte {} of {}", range.start, path.display()),
            source,
        )
    })?;

    let reader = BufReader::with_capacity(config.read_buffer_size, file.take(range.len()));
    let mut source = RecordSource::new(reader);
    let state = aggregate_until(
        &mut source,
        AggregationState::with_capacity(config.station_capacity),
        observer,
        config.progress_interval,
        || failures.should_stop(range.index),
    )?;

    match &state {
        Some(state) => debug!(
            "Chunk {} [{}..{}) produced {} records over {} stations",
            range.index,
            range.start,
            range.end,
            state.record_count(),
            state.station_count()
        ),
        None => debug!(
            "Chunk {} abandoned after {} lines, an earlier chunk failed",
            range.index,
            source.line_number()
        ),
    }
    Ok(state)
}

/// Run every range on a blocking worker and merge the results.
///
/// All workers are awaited before any result is inspected. The error of the
/// lowest-indexed failing chunk is returned, with malformed line numbers
/// rewritten to absolute positions in the file.
pub async fn aggregate_parallel(
    path: &Path,
    ranges: &[ByteRange],
    config: &AggregatorConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<AggregationState> {
    let shared_path: Arc<PathBuf> = Arc::new(path.to_path_buf());
    let shared_config = Arc::new(config.clone());
    let failures = Arc::new(FailureMarker::new());

    let handles: Vec<_> = ranges
        .iter()
        .copied()
        .map(|range| {
            let path = Arc::clone(&shared_path);
            let config = Arc::clone(&shared_config);
            let observer = observer.clone();
            let failures = Arc::clone(&failures);
            task::spawn_blocking(move || {
                aggregate_range(&path, range, &config, observer.as_deref(), &failures)
            })
        })
        .collect();

    let outcomes = join_all(handles).await;

    let mut merged = AggregationState::with_capacity(config.station_capacity);
    for (range, outcome) in ranges.iter().zip(outcomes) {
        let state = match outcome {
            Ok(Ok(Some(state))) => state,
            Ok(Ok(None)) => {
                // Only chunks after a failed one are abandoned, and that
                // failure is returned before this chunk is reached
                return Err(StationError::worker_failed(format!(
                    "chunk {} stopped without an earlier failure",
                    range.index
                )));
            }
            Ok(Err(error)) => {
                error!("Chunk {} failed: {}", range.index, error);
                return Err(absolute_error(path, range, error));
            }
            Err(join_error) => {
                error!("Chunk {} worker did not complete: {}", range.index, join_error);
                return Err(StationError::worker_failed(format!(
                    "chunk {}: {}",
                    range.index, join_error
                )));
            }
        };
        merged.merge(state);
    }

    Ok(merged)
}

/// Translate a chunk-relative malformed line number into a file line number
fn absolute_error(path: &Path, range: &ByteRange, error: StationError) -> StationError {
    if !error.is_malformed() || range.start == 0 {
        return error;
    }

    let lines_before = File::open(path).and_then(|mut file| count_lines_before(&mut file, range.start));
    match lines_before {
        Ok(lines) => error.with_line_offset(lines),
        Err(io_error) => {
            debug!(
                "Could not count lines before chunk {}: {}; reporting chunk-relative line",
                range.index, io_error
            );
            error
        }
    }
}
