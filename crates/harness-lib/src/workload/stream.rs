//! STREAM memory bandwidth benchmark

use super::{is_separator, Workload};
use crate::models::BenchmarkRecord;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Marker line that opens the STREAM summary table
pub const STREAM_HEADER: &str = "Function      Rate (MB/s)   Avg time     Min time     Max time";

const STREAM_FUNCTIONS: &[&str] = &["Copy", "Scale", "Add", "Triad"];
const STREAM_COLUMNS: &[&str] = &["rate_mb_s", "avg_time_s", "min_time_s", "max_time_s"];

pub struct StreamWorkload {
    binary: PathBuf,
    row: Regex,
}

impl StreamWorkload {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            row: Regex::new(
                r"^(?P<function>[A-Za-z]+):\s+(?P<rate>[0-9.eE+-]+)\s+(?P<avg>[0-9.eE+-]+)\s+(?P<min>[0-9.eE+-]+)\s+(?P<max>[0-9.eE+-]+)",
            )
            .expect("static regex"),
        }
    }

    fn parse_line(&self, line: &str) -> Option<BenchmarkRecord> {
        let caps = self.row.captures(line)?;
        let function = caps.name("function")?.as_str();
        if !STREAM_FUNCTIONS.contains(&function) {
            return None;
        }
        let number = |name: &str| caps.name(name)?.as_str().parse::<f64>().ok();
        Some(BenchmarkRecord {
            function: function.to_string(),
            rate: number("rate")?,
            avg_time: number("avg")?,
            min_time: Some(number("min")?),
            max_time: Some(number("max")?),
        })
    }
}

impl Workload for StreamWorkload {
    fn name(&self) -> &str {
        "stream"
    }

    fn monitor_output(&self) -> &str {
        "stream_numa_stat_log.csv"
    }

    fn run_column(&self) -> &str {
        "stream_run"
    }

    fn required_binaries(&self) -> Vec<(&str, &Path)> {
        vec![("STREAM", self.binary.as_path())]
    }

    fn command(&self, _offset: usize) -> Vec<String> {
        vec![self.binary.display().to_string()]
    }

    fn parse(&self, stdout: &str) -> Vec<BenchmarkRecord> {
        let mut lines = stdout.lines().map(str::trim);
        if !lines.any(|line| line == STREAM_HEADER) {
            return Vec::new();
        }

        lines
            .take_while(|line| !line.is_empty() && !is_separator(line))
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn expected_functions(&self) -> &[&'static str] {
        STREAM_FUNCTIONS
    }

    fn column_suffixes(&self) -> &[&'static str] {
        STREAM_COLUMNS
    }

    fn render(&self, record: &BenchmarkRecord) -> Vec<String> {
        let time = |v: Option<f64>| v.map(|t| format!("{:.9}", t)).unwrap_or_default();
        vec![
            format!("{:.6}", record.rate),
            format!("{:.9}", record.avg_time),
            time(record.min_time),
            time(record.max_time),
        ]
    }
}
