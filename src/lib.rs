//! Station Summary Library
//!
//! Single-pass aggregation of very large `station;temperature` measurement
//! files into per-station minimum, mean and maximum values.
//!
//! This library provides tools for:
//! - Streaming records line by line with strict validation
//! - Aggregating into a hash map and merging partial results
//! - Splitting files into line-aligned chunks for parallel workers
//! - Rendering sorted summaries with configurable rounding
//! - Generating synthetic measurement files for testing and benchmarking

pub mod aggregator;
pub mod config;
pub mod constants;
pub mod error;
pub mod generator;
pub mod models;
pub mod processor;
pub mod progress;
pub mod source;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use aggregator::{AggregationState, summarize_reader};
pub use config::{AggregatorConfig, GeneratorConfig};
pub use error::{MalformedReason, Result, StationError};
pub use models::{ProcessingStats, ResultEntry, RoundingMode, StationStats, StationSummary};
pub use processor::{ProcessingOutcome, StationProcessor};
pub use progress::ProgressObserver;
pub use source::{Record, RecordSource, StationRecord};
