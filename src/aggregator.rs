//! Aggregation engine: the single-pass per-station reducer.
//!
//! Every record costs one hash lookup keyed by a borrowed `&str`; the station
//! name is only allocated the first time it is seen. Memory therefore grows
//! with the number of distinct stations, never with the number of records.

use crate::error::Result;
use crate::models::{ResultEntry, RoundingMode, StationStats, StationSummary};
use crate::progress::{ProgressObserver, ProgressTicker};
use crate::source::RecordSource;
use rustc_hash::FxHashMap;
use std::io::BufRead;
use tracing::debug;

/// Per-run map from station name to running statistics
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    stations: FxHashMap<String, StationStats>,
    records: u64,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stations: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            records: 0,
        }
    }

    /// Fold one reading into the state
    #[inline]
    pub fn update(&mut self, station: &str, temperature: f64) {
        self.records += 1;
        match self.stations.get_mut(station) {
            Some(stats) => stats.record(temperature),
            None => {
                self.stations
                    .insert(station.to_owned(), StationStats::new(temperature));
            }
        }
    }

    /// Merge a state built from a disjoint part of the input
    pub fn merge(&mut self, other: AggregationState) {
        self.records += other.records;
        for (station, stats) in other.stations {
            match self.stations.get_mut(&station) {
                Some(existing) => existing.merge(&stats),
                None => {
                    self.stations.insert(station, stats);
                }
            }
        }
    }

    pub fn get(&self, station: &str) -> Option<&StationStats> {
        self.stations.get(station)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Number of records folded in, including merged states
    pub fn record_count(&self) -> u64 {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Compute means, sort by station, and fix the output rounding
    pub fn finalize(self, rounding: RoundingMode) -> StationSummary {
        let entries = self
            .stations
            .into_iter()
            .map(|(station, stats)| ResultEntry::from_stats(station, &stats))
            .collect();
        StationSummary::new(entries, rounding)
    }
}

/// Consume a record source into a fresh aggregation state
pub fn aggregate<R: BufRead>(source: &mut RecordSource<R>) -> Result<AggregationState> {
    aggregate_observed(source, AggregationState::new(), None, 1)
}

/// Consume a record source, notifying `observer` every `interval` records.
///
/// The first malformed or unreadable line aborts the pass; the partially
/// built state is dropped and never returned.
pub fn aggregate_observed<R: BufRead>(
    source: &mut RecordSource<R>,
    state: AggregationState,
    observer: Option<&dyn ProgressObserver>,
    interval: u64,
) -> Result<AggregationState> {
    // A pass that is never asked to stop always yields its state
    let state = aggregate_until(source, state, observer, interval, || false)?;
    Ok(state.unwrap_or_default())
}

/// Like [`aggregate_observed`], but polls `should_stop` every `interval`
/// records and returns `Ok(None)` as soon as it answers `true`.
pub fn aggregate_until<R, F>(
    source: &mut RecordSource<R>,
    mut state: AggregationState,
    observer: Option<&dyn ProgressObserver>,
    interval: u64,
    should_stop: F,
) -> Result<Option<AggregationState>>
where
    R: BufRead,
    F: Fn() -> bool,
{
    let interval = interval.max(1);
    let mut ticker = ProgressTicker::new(observer, interval);
    let mut since_check = 0u64;

    while let Some(record) = source.next_record()? {
        state.update(record.station, record.temperature);
        ticker.tick();

        since_check += 1;
        if since_check == interval {
            since_check = 0;
            if should_stop() {
                ticker.flush();
                debug!("Stopped after {} lines on request", source.line_number());
                return Ok(None);
            }
        }
    }
    ticker.flush();

    debug!(
        "Aggregated {} lines into {} stations",
        source.line_number(),
        state.station_count()
    );
    Ok(Some(state))
}

/// Aggregate an in-memory or otherwise buffered input straight to a summary
pub fn summarize_reader<R: BufRead>(reader: R, rounding: RoundingMode) -> Result<StationSummary> {
    let mut source = RecordSource::new(reader);
    Ok(aggregate(&mut source)?.finalize(rounding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StationError;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn state_from(lines: &[&str]) -> AggregationState {
        let input = lines.iter().map(|l| format!("{l}\n")).collect::<String>();
        let mut source = RecordSource::new(Cursor::new(input.into_bytes()));
        aggregate(&mut source).unwrap()
    }

    fn summary_from(lines: &[&str]) -> StationSummary {
        state_from(lines).finalize(RoundingMode::HalfAwayFromZero)
    }

    /// Small deterministic LCG so tests can build varied record sets
    fn pseudo_random_lines(count: usize, seed: u64) -> Vec<String> {
        let stations = ["Abha", "Bergen", "Cairo", "Dakar", "Oslo", "Rome", "Zagreb"];
        let mut state = seed;
        (0..count)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let station = stations[(state >> 33) as usize % stations.len()];
                let tenths = ((state >> 17) % 1999) as i64 - 999;
                format!("{};{:.1}", station, tenths as f64 / 10.0)
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_example() {
        let summary = summary_from(&["Rome;12.0", "Rome;14.0", "Oslo;-3.5"]);
        let formatted = summary.formatted();

        assert_eq!(formatted.len(), 2);
        assert_eq!(formatted["Oslo"], "-3.5/-3.5/-3.5");
        assert_eq!(formatted["Rome"], "12.0/13.0/14.0");
        let keys: Vec<_> = formatted.keys().cloned().collect();
        assert_eq!(keys, vec!["Oslo", "Rome"]);
    }

    #[test]
    fn test_update_inserts_then_updates() {
        let mut state = AggregationState::new();
        state.update("Rome", 12.0);

        let stats = state.get("Rome").unwrap();
        assert_eq!((stats.min, stats.max, stats.sum, stats.count), (12.0, 12.0, 12.0, 1));

        state.update("Rome", 14.0);
        state.update("Rome", 11.0);
        let stats = state.get("Rome").unwrap();
        assert_eq!((stats.min, stats.max, stats.sum, stats.count), (11.0, 14.0, 37.0, 3));
        assert_eq!(state.record_count(), 3);
        assert_eq!(state.station_count(), 1);
    }

    #[test]
    fn test_all_negative_readings_keep_real_extremes() {
        // A zero-initialised max would wrongly report 0.0 here
        let stats = *state_from(&["Nuuk;-10.5", "Nuuk;-2.0", "Nuuk;-30.0"])
            .get("Nuuk")
            .unwrap();
        assert_eq!(stats.min, -30.0);
        assert_eq!(stats.max, -2.0);
    }

    #[test]
    fn test_single_observation_boundary() {
        let summary = summary_from(&["Da Lat;2.0"]);
        let entry = summary.get("Da Lat").unwrap();

        assert_eq!(entry.min, 2.0);
        assert_eq!(entry.mean, 2.0);
        assert_eq!(entry.max, 2.0);
        assert_eq!(entry.count, 1);
        assert_eq!(entry.formatted(summary.rounding()), "2.0/2.0/2.0");
    }

    #[test]
    fn test_min_mean_max_ordering_holds() {
        let lines = pseudo_random_lines(5_000, 42);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let summary = summary_from(&refs);

        for entry in summary.entries() {
            assert!(entry.min <= entry.mean, "{}: min > mean", entry.station);
            assert!(entry.mean <= entry.max, "{}: mean > max", entry.station);
        }
    }

    #[test]
    fn test_repeated_reading_mean_equals_reading() {
        let summary = summary_from(&["A;0.1"; 10]);
        let entry = summary.get("A").unwrap();

        assert_eq!(entry.count, 10);
        assert_eq!((entry.min, entry.mean, entry.max), (0.1, 0.1, 0.1));
        assert_eq!(summary.formatted()["A"], "0.1/0.1/0.1");
    }

    #[test]
    fn test_extreme_accepted_values_never_render_infinite() {
        let summary = summary_from(&["A;1e308", "A;1e308", "B;-1.7e308"]);

        for (station, formatted) in summary.formatted() {
            assert!(!formatted.contains("inf"), "{station}: {formatted}");
            assert_eq!(formatted.split('/').count(), 3);
            assert!(formatted.split('/').all(|part| part.ends_with(".0")));
        }
        let a = summary.get("A").unwrap();
        assert!(a.min <= a.mean && a.mean <= a.max);
    }

    #[test]
    fn test_aggregate_until_stops_at_interval_boundary() {
        let input = "A;1.0\n".repeat(100);
        let mut source = RecordSource::new(Cursor::new(input.into_bytes()));
        let checks = AtomicU64::new(0);

        let result = aggregate_until(&mut source, AggregationState::new(), None, 10, || {
            checks.fetch_add(1, Ordering::Relaxed) >= 2
        })
        .unwrap();

        assert!(result.is_none());
        assert_eq!(checks.into_inner(), 3);
        assert_eq!(source.line_number(), 30);
    }

    #[test]
    fn test_aggregate_until_without_stop_matches_aggregate() {
        let input = "A;1.0\nB;2.0\nA;3.0\n";
        let mut source = RecordSource::new(Cursor::new(input.as_bytes().to_vec()));

        let state = aggregate_until(&mut source, AggregationState::new(), None, 1, || false)
            .unwrap()
            .unwrap();

        assert_eq!(state.record_count(), 3);
        assert_eq!(state.get("A").unwrap().max, 3.0);
    }

    #[test]
    fn test_output_keys_strictly_ascending() {
        let lines = pseudo_random_lines(2_000, 7);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let summary = summary_from(&refs);

        for pair in summary.entries().windows(2) {
            assert!(pair[0].station.as_bytes() < pair[1].station.as_bytes());
        }
    }

    #[test]
    fn test_permutations_give_identical_output() {
        let lines = pseudo_random_lines(3_000, 99);
        let forward: Vec<&str> = lines.iter().map(String::as_str).collect();
        let reversed: Vec<&str> = forward.iter().rev().copied().collect();
        let mut interleaved: Vec<&str> = forward.iter().step_by(2).copied().collect();
        interleaved.extend(forward.iter().skip(1).step_by(2));

        let expected = summary_from(&forward).formatted();
        assert_eq!(summary_from(&reversed).formatted(), expected);
        assert_eq!(summary_from(&interleaved).formatted(), expected);
    }

    #[test]
    fn test_merge_of_contiguous_partitions_matches_direct() {
        let lines = pseudo_random_lines(4_000, 1234);
        let all: Vec<&str> = lines.iter().map(String::as_str).collect();
        let expected = summary_from(&all);

        for split in [0, 1, 1_337, 3_999, 4_000] {
            let mut left = state_from(&all[..split]);
            left.merge(state_from(&all[split..]));

            assert_eq!(left.record_count(), 4_000);
            let merged = left.finalize(RoundingMode::HalfAwayFromZero);
            assert_eq!(merged.formatted(), expected.formatted(), "split at {split}");
            for (a, b) in merged.entries().iter().zip(expected.entries()) {
                assert_eq!(a.count, b.count);
                assert_eq!(a.min, b.min);
                assert_eq!(a.max, b.max);
            }
        }
    }

    #[test]
    fn test_malformed_line_aborts_without_result() {
        let input = "Rome;12.0\nRome32.5\nOslo;-3.5\n";
        let result = summarize_reader(Cursor::new(input), RoundingMode::default());

        match result {
            Err(StationError::MalformedRecord { line_number, line, .. }) => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "Rome32.5");
            }
            other => panic!("Expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_gives_empty_summary() {
        let summary = summarize_reader(Cursor::new(""), RoundingMode::default()).unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn test_observer_sees_every_record() {
        let seen = AtomicU64::new(0);
        let calls = AtomicU64::new(0);
        let observer = |count: u64| {
            seen.fetch_add(count, Ordering::Relaxed);
            calls.fetch_add(1, Ordering::Relaxed);
        };

        let lines = pseudo_random_lines(1_050, 5);
        let input = lines.join("\n");
        let mut source = RecordSource::new(Cursor::new(input.into_bytes()));
        let state =
            aggregate_observed(&mut source, AggregationState::new(), Some(&observer), 100).unwrap();

        assert_eq!(state.record_count(), 1_050);
        assert_eq!(seen.load(Ordering::Relaxed), 1_050);
        assert_eq!(calls.load(Ordering::Relaxed), 11);
    }
}
