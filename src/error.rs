//! Error handling for station aggregation runs.
//!
//! Every variant here is fatal for the run that raised it: the record source
//! and the aggregation engine surface the first fault and never skip a line.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single input line could not be turned into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("missing ';' delimiter")]
    MissingDelimiter,

    #[error("empty station name")]
    EmptyStation,

    #[error("invalid temperature '{0}'")]
    InvalidTemperature(String),

    #[error("temperature '{0}' is not a finite number")]
    NonFiniteTemperature(String),

    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Malformed record at line {line_number}: {reason} (line: {line:?})")]
    MalformedRecord {
        line_number: u64,
        line: String,
        reason: MalformedReason,
    },

    #[error("Input source unavailable: {context}")]
    SourceUnavailable {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Station list error in file: {path} - {reason}")]
    StationList { path: PathBuf, reason: String },

    #[error("Aggregation worker failed: {reason}")]
    WorkerFailed { reason: String },

    #[error("Processing interrupted: {reason}")]
    ProcessingInterrupted { reason: String },
}

impl StationError {
    /// Create a malformed record error from the raw bytes of the offending line
    pub fn malformed(line_number: u64, raw_line: &[u8], reason: MalformedReason) -> Self {
        Self::MalformedRecord {
            line_number,
            line: String::from_utf8_lossy(raw_line).into_owned(),
            reason,
        }
    }

    /// Create a source unavailable error with context
    pub fn source_unavailable(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::SourceUnavailable {
            context: context.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a station list error
    pub fn station_list(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StationList {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a worker failure error
    pub fn worker_failed(reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            reason: reason.into(),
        }
    }

    /// Create a processing interrupted error
    pub fn processing_interrupted(reason: impl Into<String>) -> Self {
        Self::ProcessingInterrupted {
            reason: reason.into(),
        }
    }

    /// Shift the line number of a malformed record error by `lines_before`.
    ///
    /// Workers number lines from the start of their own chunk; the coordinator
    /// uses this to report the absolute line in the file.
    pub fn with_line_offset(self, lines_before: u64) -> Self {
        match self {
            Self::MalformedRecord {
                line_number,
                line,
                reason,
            } => Self::MalformedRecord {
                line_number: line_number + lines_before,
                line,
                reason,
            },
            other => other,
        }
    }

    /// Check if this error came from unparseable input rather than I/O
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}

pub type Result<T> = std::result::Result<T, StationError>;
