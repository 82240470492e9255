//! Synthetic measurement file generator.
//!
//! Draws station names uniformly from a station list and temperatures
//! uniformly from a fixed range, and writes them in batches as
//! `name;temp` lines that the record source accepts.

use crate::config::GeneratorConfig;
use crate::constants::{COMMENT_PREFIX, FIELD_DELIMITER, MEASUREMENT_FIELD_WIDTH};
use crate::error::{Result, StationError};
use crate::models::RoundingMode;
use crate::progress::ProgressObserver;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Summary of a completed generation run
#[derive(Debug, Clone)]
pub struct GenerationStats {
    pub output_path: PathBuf,
    pub records_written: u64,
    pub bytes_written: u64,
    pub stations: usize,
    pub elapsed: Duration,
}

/// Read the unique station names from a `;`-separated station list.
///
/// Blank lines and `#` comments are skipped; only the first field is kept.
/// Names come back sorted so a seeded run is reproducible.
pub fn load_station_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|source| {
        StationError::source_unavailable(
            format!("station list {} not found", path.display()),
            source,
        )
    })?;

    let mut names = BTreeSet::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| {
            StationError::source_unavailable(format!("cannot read {}", path.display()), source)
        })?;
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        let name = line
            .split(FIELD_DELIMITER as char)
            .next()
            .unwrap_or_default();
        if !name.is_empty() {
            names.insert(name.to_string());
        }
    }

    if names.is_empty() {
        return Err(StationError::station_list(path, "no station names found"));
    }

    debug!("Loaded {} station names from {}", names.len(), path.display());
    Ok(names.into_iter().collect())
}

/// Estimate the size of a generated file in bytes.
///
/// Uses the average name length plus the widest measurement field and a
/// newline per record, so real files usually come out somewhat smaller.
pub fn estimate_file_size(names: &[String], num_records: u64) -> u64 {
    if names.is_empty() {
        return 0;
    }

    let total_length: usize = names.iter().map(String::len).sum();
    let average_length = total_length as f64 / names.len() as f64;
    let record_size = average_length + MEASUREMENT_FIELD_WIDTH as f64 + 1.0;
    (record_size * num_records as f64) as u64
}

/// Format a byte count as bytes, KiB, MiB or GiB with one decimal
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["bytes", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;

    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} {}", size, UNITS[UNITS.len() - 1])
}

/// Format an elapsed duration for humans
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds < 60.0 {
        return format!("{:.3} seconds", seconds);
    }

    let whole = elapsed.as_secs();
    let (hours, remainder) = (whole / 3600, whole % 3600);
    let (minutes, seconds) = (remainder / 60, remainder % 60);
    if hours == 0 {
        format!("{} minutes {} seconds", minutes, seconds)
    } else {
        format!("{} hours {} minutes {} seconds", hours, minutes, seconds)
    }
}

/// Parse a record count such as `1_000_000`; used as a clap value parser
pub fn parse_record_count(input: &str) -> std::result::Result<u64, String> {
    let count: u64 = input
        .replace('_', "")
        .parse()
        .map_err(|_| format!("'{}' is not a whole number", input))?;
    if count == 0 {
        return Err("the number of records must be a positive integer".to_string());
    }
    Ok(count)
}

/// Writes random measurement lines
pub struct MeasurementGenerator {
    names: Vec<String>,
    rng: StdRng,
    coldest: f64,
    hottest: f64,
    batch_size: usize,
    batch: String,
}

impl MeasurementGenerator {
    pub fn new(names: Vec<String>, config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        if names.is_empty() {
            return Err(StationError::station_list(
                &config.stations_path,
                "no station names to draw from",
            ));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            names,
            rng,
            coldest: config.coldest,
            hottest: config.hottest,
            batch_size: config.batch_size,
            batch: String::new(),
        })
    }

    /// Write `count` records as whole batches plus one leftover batch
    pub fn write_records<W: Write>(
        &mut self,
        writer: &mut W,
        count: u64,
        observer: Option<&dyn ProgressObserver>,
    ) -> io::Result<()> {
        let batch_size = self.batch_size as u64;
        let full_batches = count / batch_size;
        let leftover = count % batch_size;

        for _ in 0..full_batches {
            self.write_batch(writer, self.batch_size)?;
            if let Some(observer) = observer {
                observer.records_processed(batch_size);
            }
        }
        if leftover > 0 {
            self.write_batch(writer, leftover as usize)?;
            if let Some(observer) = observer {
                observer.records_processed(leftover);
            }
        }
        Ok(())
    }

    fn write_batch<W: Write>(&mut self, writer: &mut W, count: usize) -> io::Result<()> {
        self.batch.clear();
        for _ in 0..count {
            let name = &self.names[self.rng.random_range(0..self.names.len())];
            let temperature = self.rng.random_range(self.coldest..=self.hottest);
            self.batch.push_str(name);
            self.batch.push(FIELD_DELIMITER as char);
            self.batch
                .push_str(&RoundingMode::HalfAwayFromZero.format(temperature));
            self.batch.push('\n');
        }
        writer.write_all(self.batch.as_bytes())
    }
}

/// Generate a complete measurement file as described by `config`
pub fn generate(
    config: &GeneratorConfig,
    observer: Option<&dyn ProgressObserver>,
) -> Result<GenerationStats> {
    config.validate()?;
    let names = load_station_names(&config.stations_path)?;
    info!(
        "Estimated file size: {} (the final size may be smaller)",
        format_bytes(estimate_file_size(&names, config.num_records))
    );
    generate_with_names(config, names, observer)
}

/// Generate a measurement file from an already loaded station list.
///
/// `config.stations_path` is not read again.
pub fn generate_with_names(
    config: &GeneratorConfig,
    names: Vec<String>,
    observer: Option<&dyn ProgressObserver>,
) -> Result<GenerationStats> {
    let start_time = Instant::now();
    let stations = names.len();
    let mut generator = MeasurementGenerator::new(names, config)?;

    if let Some(parent) = config.output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(&config.output_path)?);
    generator.write_records(&mut writer, config.num_records, observer)?;
    writer.flush()?;
    drop(writer);

    let bytes_written = fs::metadata(&config.output_path)?.len();
    let elapsed = start_time.elapsed();
    info!(
        "Wrote {} records ({}) to {} in {}",
        config.num_records,
        format_bytes(bytes_written),
        config.output_path.display(),
        format_elapsed(elapsed)
    );

    Ok(GenerationStats {
        output_path: config.output_path.clone(),
        records_written: config.num_records,
        bytes_written,
        stations,
        elapsed,
    })
}
