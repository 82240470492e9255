//! Core data structures for station aggregation.
//!
//! Defines the per-station running statistics, the finalized result
//! entries, the sorted summary handed to callers, and run statistics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Running statistics for one station key.
///
/// A value only exists once the station has been observed, so `count` is
/// always at least one and `min`/`max` are real readings, never sentinels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
}

impl StationStats {
    /// Start the statistics from the first observed reading
    pub fn new(temperature: f64) -> Self {
        Self {
            min: temperature,
            max: temperature,
            sum: temperature,
            count: 1,
        }
    }

    /// Fold one more reading into the statistics
    #[inline]
    pub fn record(&mut self, temperature: f64) {
        if temperature < self.min {
            self.min = temperature;
        }
        if temperature > self.max {
            self.max = temperature;
        }
        self.sum += temperature;
        self.count += 1;
    }

    /// Combine statistics gathered over a disjoint set of records
    pub fn merge(&mut self, other: &StationStats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
    }

    /// Arithmetic mean, kept within `[min, max]`.
    ///
    /// Summing repeated readings can drift below the smallest one
    /// (ten times 0.1 sums to 0.9999999999999999), and huge readings can
    /// overflow the sum, so the quotient is clamped to the observed range.
    pub fn mean(&self) -> f64 {
        (self.sum / self.count as f64).clamp(self.min, self.max)
    }
}

/// Rounding rule used when rendering values with one decimal digit
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum RoundingMode {
    /// 0.25 renders as 0.3 and -0.25 as -0.3
    #[default]
    HalfAwayFromZero,
    /// 0.25 renders as 0.2 and 0.35 as 0.4 (banker's rounding)
    HalfEven,
}

impl RoundingMode {
    /// Round to the nearest tenth, normalising negative zero to zero
    pub fn round_to_tenths(self, value: f64) -> f64 {
        let scaled = value * 10.0;
        if !scaled.is_finite() {
            // Magnitudes this large have no fractional part to round
            return value + 0.0;
        }
        let rounded = match self {
            RoundingMode::HalfAwayFromZero => scaled.round(),
            RoundingMode::HalfEven => scaled.round_ties_even(),
        };
        // -0.0 + 0.0 is +0.0, so "-0.0" never reaches the output
        rounded / 10.0 + 0.0
    }

    /// Render a value with exactly one fractional digit
    pub fn format(self, value: f64) -> String {
        format!("{:.1}", self.round_to_tenths(value))
    }
}

/// Finalized statistics for one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub station: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub count: u64,
}

impl ResultEntry {
    pub fn from_stats(station: String, stats: &StationStats) -> Self {
        Self {
            station,
            min: stats.min,
            mean: stats.mean(),
            max: stats.max,
            count: stats.count,
        }
    }

    /// Render as `min/mean/max`
    pub fn formatted(&self, rounding: RoundingMode) -> String {
        format!(
            "{}/{}/{}",
            rounding.format(self.min),
            rounding.format(self.mean),
            rounding.format(self.max)
        )
    }
}

/// Result of one aggregation run, sorted by station name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    entries: Vec<ResultEntry>,
    rounding: RoundingMode,
}

impl StationSummary {
    /// Build a summary, sorting entries by byte-wise station order
    pub fn new(mut entries: Vec<ResultEntry>, rounding: RoundingMode) -> Self {
        entries.sort_unstable_by(|a, b| a.station.cmp(&b.station));
        Self { entries, rounding }
    }

    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a station by exact name
    pub fn get(&self, station: &str) -> Option<&ResultEntry> {
        self.entries
            .binary_search_by(|entry| entry.station.as_str().cmp(station))
            .ok()
            .map(|index| &self.entries[index])
    }

    /// Total number of readings across all stations
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// The ordered station -> `min/mean/max` mapping
    pub fn formatted(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|entry| (entry.station.clone(), entry.formatted(self.rounding)))
            .collect()
    }

    /// One `name=min/mean/max` line per station
    pub fn to_lines(&self) -> String {
        let mut output = String::new();
        for entry in &self.entries {
            output.push_str(&entry.station);
            output.push('=');
            output.push_str(&entry.formatted(self.rounding));
            output.push('\n');
        }
        output
    }
}

impl fmt::Display for StationSummary {
    /// Renders `{Oslo=-3.5/-3.5/-3.5, Rome=12.0/13.0/14.0}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", entry.station, entry.formatted(self.rounding))?;
        }
        write!(f, "}}")
    }
}

/// Statistics describing one aggregation run
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    pub input_path: PathBuf,
    pub records_processed: u64,
    pub stations: usize,
    pub bytes_read: u64,
    pub chunks: usize,
    pub workers: usize,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    /// Records per second, or zero for runs too quick to time
    pub fn throughput(&self) -> f64 {
        if self.processing_time_ms == 0 {
            0.0
        } else {
            self.records_processed as f64 / (self.processing_time_ms as f64 / 1000.0)
        }
    }
}
