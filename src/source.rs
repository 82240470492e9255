//! Record source: line decoding for `station;temperature` files.
//!
//! Reads a buffered byte stream forward-only, one line at a time, and turns
//! each line into a station name and a temperature. The line buffer is reused,
//! so the borrowed [`RecordSource::next_record`] path allocates nothing per record.

use crate::constants::{CARRIAGE_RETURN, FIELD_DELIMITER, LINE_TERMINATOR};
use crate::error::{MalformedReason, Result, StationError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// A parsed record borrowing its station name from the source's line buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record<'a> {
    pub station: &'a str,
    pub temperature: f64,
}

impl Record<'_> {
    pub fn to_owned_record(&self) -> StationRecord {
        StationRecord {
            station: self.station.to_string(),
            temperature: self.temperature,
        }
    }
}

/// An owned record, as yielded by the `Iterator` implementation
#[derive(Debug, Clone, PartialEq)]
pub struct StationRecord {
    pub station: String,
    pub temperature: f64,
}

/// Single-pass reader of delimited measurement lines
pub struct RecordSource<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: u64,
    exhausted: bool,
}

impl RecordSource<BufReader<File>> {
    /// Open a measurement file for reading
    pub fn open(path: &Path, buffer_capacity: usize) -> Result<Self> {
        let file = File::open(path).map_err(|source| {
            StationError::source_unavailable(format!("cannot open {}", path.display()), source)
        })?;
        debug!(
            "Opened record source {} with {} byte buffer",
            path.display(),
            buffer_capacity
        );
        Ok(Self::new(BufReader::with_capacity(buffer_capacity, file)))
    }
}

impl<R: BufRead> RecordSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(128),
            line_number: 0,
            exhausted: false,
        }
    }

    /// 1-based number of the last line read, 0 before the first read
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read and parse the next line.
    ///
    /// Returns `Ok(None)` at end of input. After the first error the source is
    /// exhausted and keeps returning `Ok(None)`.
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        if self.exhausted {
            return Ok(None);
        }

        self.buffer.clear();
        let read = match self.reader.read_until(LINE_TERMINATOR, &mut self.buffer) {
            Ok(read) => read,
            Err(source) => {
                self.exhausted = true;
                return Err(StationError::source_unavailable(
                    format!("read failed after line {}", self.line_number),
                    source,
                ));
            }
        };

        if read == 0 {
            self.exhausted = true;
            return Ok(None);
        }

        self.line_number += 1;
        match parse_record(strip_line_terminator(&self.buffer), self.line_number) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                self.exhausted = true;
                Err(error)
            }
        }
    }
}

impl<R: BufRead> Iterator for RecordSource<R> {
    type Item = Result<StationRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
            .map(|record| record.map(|r| r.to_owned_record()))
            .transpose()
    }
}

/// Drop one trailing `\n` and then one trailing `\r`
fn strip_line_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(line);
    line.strip_suffix(&[CARRIAGE_RETURN]).unwrap_or(line)
}

/// Parse one line (without terminator) into a record.
///
/// The line is split on the first `;`. The station name is kept verbatim and
/// must be non-empty; the temperature must parse as a finite `f64`.
pub fn parse_record(line: &[u8], line_number: u64) -> Result<Record<'_>> {
    let text = std::str::from_utf8(line)
        .map_err(|_| StationError::malformed(line_number, line, MalformedReason::InvalidUtf8))?;

    let (station, value) = text
        .split_once(FIELD_DELIMITER as char)
        .ok_or_else(|| StationError::malformed(line_number, line, MalformedReason::MissingDelimiter))?;

    if station.is_empty() {
        return Err(StationError::malformed(
            line_number,
            line,
            MalformedReason::EmptyStation,
        ));
    }

    let temperature: f64 = value.parse().map_err(|_| {
        StationError::malformed(
            line_number,
            line,
            MalformedReason::InvalidTemperature(value.to_string()),
        )
    })?;

    if !temperature.is_finite() {
        return Err(StationError::malformed(
            line_number,
            line,
            MalformedReason::NonFiniteTemperature(value.to_string()),
        ));
    }

    Ok(Record {
        station,
        temperature,
    })
}
