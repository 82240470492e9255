//! End-to-end tests: generate a measurement file, then aggregate it
//!
//! Exercises the public API the way the CLI does, across the generator,
//! the sequential pass and the parallel chunked pass.

use station_summary::generator::{self, GenerationStats};
use station_summary::{
    AggregatorConfig, GeneratorConfig, RoundingMode, StationError, StationProcessor,
    summarize_reader,
};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::TempDir;

const STATION_LIST: &str = "\
# Station list used by the generator
# name;mean temperature
Abha;18.0
Abidjan;26.0
Abéché;29.4
Accra;26.4
Addis Ababa;16.0
Adelaide;17.3
Aden;29.1
Ahvaz;25.4
Albuquerque;14.0
Alexandra;11.0
";

fn generate_fixture(temp_dir: &TempDir, records: u64, seed: u64) -> GenerationStats {
    let stations = temp_dir.path().join("weather_stations.csv");
    fs::write(&stations, STATION_LIST).unwrap();

    let config = GeneratorConfig::default()
        .with_stations_path(&stations)
        .with_output_path(temp_dir.path().join("data").join("measurements.txt"))
        .with_num_records(records)
        .with_seed(seed);
    generator::generate(&config, None).unwrap()
}

fn count_lines(path: &Path) -> u64 {
    fs::read(path)
        .unwrap()
        .iter()
        .filter(|&&byte| byte == b'\n')
        .count() as u64
}

#[tokio::test]
async fn test_generated_file_aggregates_to_every_station() {
    let temp_dir = TempDir::new().unwrap();
    let generated = generate_fixture(&temp_dir, 50_000, 1);
    assert_eq!(count_lines(&generated.output_path), 50_000);

    let outcome = StationProcessor::new(&generated.output_path)
        .unwrap()
        .with_config(AggregatorConfig::default().with_workers(4))
        .process()
        .await
        .unwrap();

    assert_eq!(outcome.summary.len(), 10);
    assert_eq!(outcome.summary.total_count(), 50_000);
    assert!(outcome.summary.get("Abéché").is_some());
    for entry in outcome.summary.entries() {
        assert!(entry.min <= entry.mean && entry.mean <= entry.max);
        assert!(entry.min >= -99.9 && entry.max <= 99.9);
    }
}

#[tokio::test]
async fn test_parallel_and_sequential_runs_print_the_same_summary() {
    let temp_dir = TempDir::new().unwrap();
    let generated = generate_fixture(&temp_dir, 120_000, 99);

    let sequential = StationProcessor::new(&generated.output_path)
        .unwrap()
        .with_config(AggregatorConfig::sequential())
        .process()
        .await
        .unwrap();
    let parallel = StationProcessor::new(&generated.output_path)
        .unwrap()
        .with_config(
            AggregatorConfig::default()
                .with_workers(6)
                .with_min_chunk_bytes(16 * 1024),
        )
        .process()
        .await
        .unwrap();

    assert!(parallel.stats.chunks > 1);
    assert_eq!(parallel.summary.to_string(), sequential.summary.to_string());
    assert_eq!(parallel.summary.to_lines(), sequential.summary.to_lines());

    let in_memory = summarize_reader(
        BufReader::new(fs::File::open(&generated.output_path).unwrap()),
        RoundingMode::default(),
    )
    .unwrap();
    assert_eq!(in_memory.to_string(), sequential.summary.to_string());
}

#[tokio::test]
async fn test_observer_sees_every_record_in_parallel_run() {
    let temp_dir = TempDir::new().unwrap();
    let generated = generate_fixture(&temp_dir, 30_000, 3);

    let seen = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&seen);
    let outcome = StationProcessor::new(&generated.output_path)
        .unwrap()
        .with_config(
            AggregatorConfig::default()
                .with_workers(3)
                .with_min_chunk_bytes(8 * 1024)
                .with_progress_interval(1_000),
        )
        .with_observer(Arc::new(move |count: u64| {
            counter.fetch_add(count, Ordering::Relaxed);
        }))
        .process()
        .await
        .unwrap();

    assert_eq!(outcome.stats.records_processed, 30_000);
    assert_eq!(seen.load(Ordering::Relaxed), 30_000);
}

#[tokio::test]
async fn test_crlf_file_matches_lf_file() {
    let temp_dir = TempDir::new().unwrap();
    let lf = temp_dir.path().join("lf.txt");
    let crlf = temp_dir.path().join("crlf.txt");
    fs::write(&lf, "Rome;12.0\nRome;14.0\nOslo;-3.5\n").unwrap();
    fs::write(&crlf, "Rome;12.0\r\nRome;14.0\r\nOslo;-3.5").unwrap();

    let lf_summary = StationProcessor::new(&lf)
        .unwrap()
        .process_blocking()
        .unwrap()
        .summary;
    let crlf_summary = StationProcessor::new(&crlf)
        .unwrap()
        .process_blocking()
        .unwrap()
        .summary;

    assert_eq!(lf_summary.to_string(), "{Oslo=-3.5/-3.5/-3.5, Rome=12.0/13.0/14.0}");
    assert_eq!(crlf_summary, lf_summary);
}

#[tokio::test]
async fn test_corrupted_generated_file_produces_no_summary() {
    let temp_dir = TempDir::new().unwrap();
    let generated = generate_fixture(&temp_dir, 5_000, 8);

    let mut content = fs::read_to_string(&generated.output_path).unwrap();
    content.push_str("Accra;NaN\n");
    fs::write(&generated.output_path, content).unwrap();

    let result = StationProcessor::new(&generated.output_path)
        .unwrap()
        .process()
        .await;

    match result {
        Err(StationError::MalformedRecord { line_number, .. }) => {
            assert_eq!(line_number, 5_001)
        }
        Err(other) => panic!("Expected MalformedRecord error, got {other:?}"),
        Ok(_) => panic!("A malformed file must not produce a summary"),
    }
}
