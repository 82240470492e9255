//! Progress reporting for aggregation and generation runs
//!
//! Progress is a side channel: observers are told how many records were
//! processed since the last call and have no way to influence the data.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Receives progress notifications while records are processed.
///
/// Implementations must be shareable across worker threads; each worker
/// reports its own increments.
pub trait ProgressObserver: Send + Sync {
    /// Called with the number of records processed since the previous call
    fn records_processed(&self, count: u64);
}

impl<F> ProgressObserver for F
where
    F: Fn(u64) + Send + Sync,
{
    fn records_processed(&self, count: u64) {
        self(count)
    }
}

/// Batches per-record ticks into one observer call every `interval` records
pub(crate) struct ProgressTicker<'a> {
    observer: Option<&'a dyn ProgressObserver>,
    interval: u64,
    pending: u64,
}

impl<'a> ProgressTicker<'a> {
    pub(crate) fn new(observer: Option<&'a dyn ProgressObserver>, interval: u64) -> Self {
        Self {
            observer,
            interval: interval.max(1),
            pending: 0,
        }
    }

    #[inline]
    pub(crate) fn tick(&mut self) {
        if let Some(observer) = self.observer {
            self.pending += 1;
            if self.pending == self.interval {
                observer.records_processed(self.pending);
                self.pending = 0;
            }
        }
    }

    /// Report whatever is left below the interval
    pub(crate) fn flush(&mut self) {
        if let Some(observer) = self.observer {
            if self.pending > 0 {
                observer.records_processed(self.pending);
                self.pending = 0;
            }
        }
    }
}

/// Terminal progress display backed by an `indicatif` progress bar
pub struct ProgressReporter {
    progress_bar: ProgressBar,
}

impl ProgressReporter {
    /// Spinner counting records when the total is unknown
    pub fn records(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {human_pos} records ({per_sec}) | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb.set_message(message.to_string());
        debug!("Record spinner initialized: {}", message);
        Self { progress_bar: pb }
    }

    /// Bar with a known record total
    pub fn bounded(total: u64, message: &str) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} ({percent}%) | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        pb.set_message(message.to_string());
        debug!("Progress bar initialized for {} records", total);
        Self { progress_bar: pb }
    }

    /// Reporter that draws nothing (quiet mode)
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
        }
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    pub fn set_message(&self, message: &str) {
        self.progress_bar.set_message(message.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.progress_bar.finish_with_message(message.to_string());
    }

    pub fn finish_with_error(&self, error_message: &str) {
        self.progress_bar
            .abandon_with_message(format!("Failed: {}", error_message));
    }

    /// Suspend drawing so other output is not interleaved with the bar
    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.progress_bar.suspend(f)
    }
}

impl ProgressObserver for ProgressReporter {
    fn records_processed(&self, count: u64) {
        self.progress_bar.inc(count);
    }
}
