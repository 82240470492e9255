//! Integration tests for the processor module
//!
//! Tests the complete aggregation pipeline against measurement files
//! written to temporary directories.


use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `lines` as a newline-terminated measurement file
pub fn write_measurements(temp_dir: &TempDir, lines: &[&str]) -> PathBuf {
    let path = temp_dir.path().join("measurements.txt");
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

/// Write `count` deterministic records spread over `stations`
pub fn write_synthetic(temp_dir: &TempDir, stations: &[&str], count: u64, seed: u64) -> PathBuf {
    let path = temp_dir.path().join("synthetic.txt");
    let mut writer = BufWriter::new(fs::File::create(&path).unwrap());
    let mut state = seed;
    let mut line = String::with_capacity(64);

    for _ in 0..count {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let station = stations[(state >> 33) as usize % stations.len()];
        let tenths = ((state >> 17) % 1999) as i64 - 999;

        line.clear();
        write!(line, "{};{:.1}", station, tenths as f64 / 10.0).unwrap();
        writeln!(writer, "{}", line).unwrap();
    }

    writer.flush().unwrap();
    path
}
