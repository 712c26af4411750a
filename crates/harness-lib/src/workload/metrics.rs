//! Per-run benchmark metrics dataset

use super::{missing_functions, records_by_function, Workload};
use crate::error::{HarnessError, Result};
use crate::models::{BenchmarkRecord, POLICY_COLUMN};
use crate::schema;
use std::path::{Path, PathBuf};
use tracing::warn;

/// What happened to one run's benchmark summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsOutcome {
    Written { missing: Vec<String> },
    /// No summary rows were parsed; nothing was written
    MissingSummary,
}

impl MetricsOutcome {
    /// Number of data warnings this outcome represents
    pub fn warnings(&self) -> usize {
        match self {
            MetricsOutcome::Written { missing } if missing.is_empty() => 0,
            _ => 1,
        }
    }
}

/// Appends one row per run with a column group per expected function
pub struct MetricsWriter<'a, W: Workload + ?Sized> {
    destination: PathBuf,
    workload: &'a W,
}

impl<'a, W: Workload + ?Sized> MetricsWriter<'a, W> {
    pub fn new(destination: impl Into<PathBuf>, workload: &'a W) -> Self {
        Self {
            destination: destination.into(),
            workload,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = vec![self.workload.run_column().to_string(), POLICY_COLUMN.to_string()];
        for function in self.workload.expected_functions() {
            let prefix = function.to_lowercase();
            header.extend(
                self.workload
                    .column_suffixes()
                    .iter()
                    .map(|suffix| format!("{}_{}", prefix, suffix)),
            );
        }
        header
    }

    pub fn append(&self, run_index: u32, policy_name: &str, records: &[BenchmarkRecord]) -> Result<MetricsOutcome> {
        if records.is_empty() {
            warn!(
                run = run_index,
                workload = self.workload.name(),
                "Workload output missing summary table"
            );
            return Ok(MetricsOutcome::MissingSummary);
        }

        let missing: Vec<String> = missing_functions(self.workload, records)
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            warn!(
                run = run_index,
                workload = self.workload.name(),
                missing = %missing.join(", "),
                "Workload output missing expected functions"
            );
        }

        let header = self.header();
        schema::ensure_header(&self.destination, &header.join(","))?;

        let by_function = records_by_function(records);
        let mut row = vec![run_index.to_string(), policy_name.to_string()];
        for function in self.workload.expected_functions() {
            match by_function.get(function) {
                Some(record) => row.extend(self.workload.render(record)),
                None => row.extend(self.workload.column_suffixes().iter().map(|_| String::new())),
            }
        }

        let file = schema::open_append(&self.destination)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .write_record(&row)
            .map_err(|e| HarnessError::csv(&self.destination, e))?;
        writer
            .flush()
            .map_err(|e| HarnessError::io(&self.destination, e))?;

        Ok(MetricsOutcome::Written { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::{DbBenchWorkload, StreamWorkload};
    use std::fs;
    use tempfile::TempDir;

    fn record(function: &str, rate: f64) -> BenchmarkRecord {
        BenchmarkRecord {
            function: function.to_string(),
            rate,
            avg_time: 0.5,
            min_time: Some(0.25),
            max_time: Some(0.75),
        }
    }

    #[test]
    fn test_stream_header_layout() {
        let workload = StreamWorkload::new("/opt/stream");
        let writer = MetricsWriter::new("unused.csv", &workload);
        let header = writer.header();
        assert_eq!(header.len(), 2 + 4 * 4);
        assert_eq!(header[0], "stream_run");
        assert_eq!(header[1], "mem_policy");
        assert_eq!(header[2], "copy_rate_mb_s");
        assert_eq!(header[17], "triad_max_time_s");
    }

    #[test]
    fn test_missing_function_leaves_empty_group() {
        let temp_dir = TempDir::new().unwrap();
        let workload = StreamWorkload::new("/opt/stream");
        let writer = MetricsWriter::new(temp_dir.path().join("metrics.csv"), &workload);

        let outcome = writer
            .append(3, "interleave_all", &[record("Copy", 10.0), record("Add", 20.0), record("Triad", 30.0)])
            .unwrap();

        assert_eq!(outcome, MetricsOutcome::Written { missing: vec!["Scale".to_string()] });
        assert_eq!(outcome.warnings(), 1);
        let content = fs::read_to_string(writer.destination()).unwrap();
        let row = content.lines().nth(1).unwrap();
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 18);
        assert_eq!(fields[0], "3");
        assert_eq!(fields[1], "interleave_all");
        assert_eq!(fields[2], "10.000000");
        assert_eq!(&fields[6..10], &["", "", "", ""]);
        assert_eq!(fields[10], "20.000000");
    }

    #[test]
    fn test_empty_summary_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let workload = StreamWorkload::new("/opt/stream");
        let writer = MetricsWriter::new(temp_dir.path().join("metrics.csv"), &workload);

        let outcome = writer.append(1, "default", &[]).unwrap();

        assert_eq!(outcome, MetricsOutcome::MissingSummary);
        assert!(!writer.destination().exists());
    }

    #[test]
    fn test_db_bench_group_width() {
        let temp_dir = TempDir::new().unwrap();
        let workload = DbBenchWorkload::new("/opt/bench.sh", 2);
        let writer = MetricsWriter::new(temp_dir.path().join("metrics.csv"), &workload);

        writer.append(1, "default", &[record("readseq", 100.0)]).unwrap();

        let content = fs::read_to_string(writer.destination()).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("run_index,mem_policy,fillrandom_rate_ops_s,fillrandom_avg_micros_op"));
        let fields: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(fields.len(), 2 + 5 * 2);
        assert_eq!(fields[4], "100.000000");
        assert_eq!(fields[5], "0.500000000");
    }

    #[test]
    fn test_header_mismatch_across_workloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("metrics.csv");
        let stream = StreamWorkload::new("/opt/stream");
        let db_bench = DbBenchWorkload::new("/opt/bench.sh", 2);

        MetricsWriter::new(&path, &stream)
            .append(1, "default", &[record("Copy", 1.0)])
            .unwrap();
        let err = MetricsWriter::new(&path, &db_bench)
            .append(2, "default", &[record("readseq", 1.0)])
            .unwrap_err();

        assert!(matches!(err, HarnessError::SchemaConsistency { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
