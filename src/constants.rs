//! Application constants for the station summary tool
//!
//! This module contains the record format, default paths, and tuning
//! defaults used throughout the aggregator and the measurement generator.

// =============================================================================
// Record Format
// =============================================================================

/// Separator between station name and temperature on each line
pub const FIELD_DELIMITER: u8 = b';';

/// Line terminator of the measurement file
pub const LINE_TERMINATOR: u8 = b'\n';

/// Optional carriage return tolerated before the line terminator
pub const CARRIAGE_RETURN: u8 = b'\r';

/// Marker for comment lines in the station list
pub const COMMENT_PREFIX: char = '#';

// =============================================================================
// Default Paths
// =============================================================================

/// Default measurement file read by `aggregate` and written by `generate`
pub const DEFAULT_MEASUREMENTS_PATH: &str = "./data/measurements.txt";

/// Default station list consumed by the generator
pub const DEFAULT_STATIONS_PATH: &str = "./data/weather_stations.csv";

// =============================================================================
// Aggregation Tuning
// =============================================================================

/// Read buffer per record source (256 KiB)
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256 * 1024;

/// Smallest byte range handed to a parallel worker (8 MiB)
pub const DEFAULT_MIN_CHUNK_BYTES: u64 = 8 * 1024 * 1024;

/// Records between two progress notifications
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Initial hash map capacity; the reference workload has a few hundred stations
pub const DEFAULT_STATION_CAPACITY: usize = 512;

/// Block size used when scanning for line boundaries
pub const BOUNDARY_SCAN_BLOCK: usize = 64 * 1024;

// =============================================================================
// Generator Defaults
// =============================================================================

/// Number of records the generator writes when none is given
pub const DEFAULT_RECORD_COUNT: u64 = 100_000_000;

/// Records rendered per write call
pub const DEFAULT_GENERATOR_BATCH_SIZE: usize = 10_000;

/// Lowest temperature the generator produces
pub const COLDEST_TEMPERATURE: f64 = -99.9;

/// Highest temperature the generator produces
pub const HOTTEST_TEMPERATURE: f64 = 99.9;

/// Widest rendered temperature plus its delimiter, used for size estimates
pub const MEASUREMENT_FIELD_WIDTH: usize = ";-123.4".len();
