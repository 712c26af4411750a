//! RocksDB db_bench driven through a helper script
//!
//! db_bench prints one summary line per benchmark, scattered between
//! `DB path:` lines and separators, so the parser scans the whole report
//! and recognizes rows by their `micros/op` and `ops/sec` unit tokens.

use super::{is_separator, Workload};
use crate::models::BenchmarkRecord;
use regex::Regex;
use std::path::{Path, PathBuf};

const DB_BENCH_FUNCTIONS: &[&str] = &[
    "fillrandom",
    "readseq",
    "readrandom",
    "readtocache",
    "readwhilescanning",
];
const DB_BENCH_COLUMNS: &[&str] = &["rate_ops_s", "avg_micros_op"];

/// Operation counts span this range over a batch
const MIN_OPERATIONS: u64 = 10_000;
const MAX_OPERATIONS: u64 = 5_000_000;

/// Log-spaced operation counts between `start` and `end`, endpoints exact
pub fn operation_schedule(intervals: usize, start: u64, end: u64) -> Vec<u64> {
    if start == 0 || end == 0 || start >= end || intervals < 2 {
        return vec![start, end];
    }

    let log_start = (start as f64).ln();
    let log_step = ((end as f64).ln() - log_start) / (intervals - 1) as f64;

    let mut schedule: Vec<u64> = (0..intervals)
        .map(|i| (log_start + i as f64 * log_step).exp().round() as u64)
        .collect();
    schedule[0] = start;
    schedule[intervals - 1] = end;
    schedule
}

pub struct DbBenchWorkload {
    helper: PathBuf,
    db_bench: Option<PathBuf>,
    schedule: Vec<u64>,
    row: Regex,
}

impl DbBenchWorkload {
    /// Helper script invoked as `<helper> <operations>` for `runs` runs
    pub fn new(helper: impl Into<PathBuf>, runs: usize) -> Self {
        Self {
            helper: helper.into(),
            db_bench: None,
            schedule: operation_schedule(runs, MIN_OPERATIONS, MAX_OPERATIONS),
            row: Regex::new(
                r"^\s*(?P<function>\w+)\s*:\s*(?P<avg>[\d.]+)\s+micros/op\s+(?P<rate>[\d.]+)\s+ops/sec",
            )
            .expect("static regex"),
        }
    }

    /// Also require the db_bench binary the helper script calls
    pub fn with_db_bench(mut self, db_bench: impl Into<PathBuf>) -> Self {
        self.db_bench = Some(db_bench.into());
        self
    }

    /// Operation count for a run offset; past the schedule the last entry repeats
    pub fn operations(&self, offset: usize) -> u64 {
        self.schedule
            .get(offset)
            .or_else(|| self.schedule.last())
            .copied()
            .unwrap_or(MAX_OPERATIONS)
    }

    fn parse_line(&self, line: &str) -> Option<BenchmarkRecord> {
        let caps = self.row.captures(line)?;
        let function = caps.name("function")?.as_str();
        if !DB_BENCH_FUNCTIONS.contains(&function) {
            return None;
        }
        Some(BenchmarkRecord {
            function: function.to_string(),
            rate: caps.name("rate")?.as_str().parse().ok()?,
            avg_time: caps.name("avg")?.as_str().parse().ok()?,
            min_time: None,
            max_time: None,
        })
    }
}

impl Workload for DbBenchWorkload {
    fn name(&self) -> &str {
        "db_bench"
    }

    fn monitor_output(&self) -> &str {
        "rocksdb_numa_stat_log.csv"
    }

    fn run_column(&self) -> &str {
        "run_index"
    }

    fn required_binaries(&self) -> Vec<(&str, &Path)> {
        let mut binaries = vec![("db_bench helper", self.helper.as_path())];
        if let Some(db_bench) = &self.db_bench {
            binaries.push(("db_bench", db_bench.as_path()));
        }
        binaries
    }

    fn command(&self, offset: usize) -> Vec<String> {
        vec![
            self.helper.display().to_string(),
            self.operations(offset).to_string(),
        ]
    }

    fn parse(&self, stdout: &str) -> Vec<BenchmarkRecord> {
        stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !is_separator(line) && !line.starts_with("DB path:"))
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn expected_functions(&self) -> &[&'static str] {
        DB_BENCH_FUNCTIONS
    }

    fn column_suffixes(&self) -> &[&'static str] {
        DB_BENCH_COLUMNS
    }

    fn render(&self, record: &BenchmarkRecord) -> Vec<String> {
        vec![
            format!("{:.6}", record.rate),
            format!("{:.9}", record.avg_time),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Keys:       16 bytes each (+ 0 bytes user-defined timestamp)
Values:     100 bytes each (50 bytes after compression)
------------------------------------------------
Initializing RocksDB Options from the specified file
DB path: [/tmp/rocksdbtest-1000/dbbench]
fillrandom   :       4.123 micros/op 242535 ops/sec 0.412 seconds 100000 operations;   26.8 MB/s
DB path: [/tmp/rocksdbtest-1000/dbbench]
readseq      :       0.201 micros/op 4975124 ops/sec 0.020 seconds 100000 operations;  550.4 MB/s
DB path: [/tmp/rocksdbtest-1000/dbbench]
readrandom   :       2.870 micros/op 348432 ops/sec 0.287 seconds 100000 operations;   38.5 MB/s (100000 of 100000 found)
compact      :   12345.000 micros/op 81 ops/sec 0.012 seconds 1 operations;
";

    #[test]
    fn test_parse_unit_token_lines() {
        let workload = DbBenchWorkload::new("/opt/bench.sh", 4);
        let records = workload.parse(REPORT);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].function, "fillrandom");
        assert!((records[0].avg_time - 4.123).abs() < 1e-12);
        assert!((records[0].rate - 242535.0).abs() < 1e-9);
        assert_eq!(records[2].function, "readrandom");
        assert!(records.iter().all(|r| r.min_time.is_none() && r.max_time.is_none()));
    }

    #[test]
    fn test_operation_schedule_is_log_spaced() {
        let schedule = operation_schedule(8, 10_000, 5_000_000);
        assert_eq!(schedule.len(), 8);
        assert_eq!(schedule[0], 10_000);
        assert_eq!(schedule[7], 5_000_000);
        assert!(schedule.windows(2).all(|w| w[0] < w[1]));
        // Constant ratio between neighbours
        let ratio = schedule[1] as f64 / schedule[0] as f64;
        let ratio_late = schedule[6] as f64 / schedule[5] as f64;
        assert!((ratio - ratio_late).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_schedule() {
        assert_eq!(operation_schedule(1, 10, 100), vec![10, 100]);
        assert_eq!(operation_schedule(5, 100, 10), vec![100, 10]);
    }

    #[test]
    fn test_command_uses_schedule() {
        let workload = DbBenchWorkload::new("/opt/bench.sh", 3);
        assert_eq!(workload.command(0), vec!["/opt/bench.sh", "10000"]);
        assert_eq!(workload.command(2), vec!["/opt/bench.sh", "5000000"]);
        assert_eq!(workload.command(9), vec!["/opt/bench.sh", "5000000"]);
    }

    #[test]
    fn test_required_binaries() {
        let workload = DbBenchWorkload::new("/opt/bench.sh", 3).with_db_bench("/opt/db_bench");
        let roles: Vec<&str> = workload.required_binaries().iter().map(|(r, _)| *r).collect();
        assert_eq!(roles, vec!["db_bench helper", "db_bench"]);
    }
}
