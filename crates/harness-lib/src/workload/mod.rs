//! Benchmarked workloads
//!
//! Each workload type is a strategy that knows how to build its command
//! line, where the monitor leaves its raw CSV, and how to read the summary
//! table the workload prints on stdout. The orchestrator is generic over it.

mod db_bench;
mod metrics;
mod stream;

pub use db_bench::{operation_schedule, DbBenchWorkload};
pub use metrics::{MetricsOutcome, MetricsWriter};
pub use stream::StreamWorkload;

use crate::models::BenchmarkRecord;
use std::collections::HashMap;
use std::path::Path;

/// Strategy describing one workload type
pub trait Workload {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// File the monitor writes inside the run directory
    fn monitor_output(&self) -> &str;

    /// Column carrying the run index in the aggregate and metrics datasets
    fn run_column(&self) -> &str;

    /// Binaries that must exist before the batch starts, with their role
    fn required_binaries(&self) -> Vec<(&str, &Path)>;

    /// Workload command for the run at zero-based `offset` within the batch
    fn command(&self, offset: usize) -> Vec<String>;

    /// Extract summary rows from the captured stdout
    fn parse(&self, stdout: &str) -> Vec<BenchmarkRecord>;

    /// Functions the summary table is expected to contain, in column order
    fn expected_functions(&self) -> &[&'static str];

    /// Column suffixes written per function
    fn column_suffixes(&self) -> &[&'static str];

    /// Field values for one record, matching [`Workload::column_suffixes`]
    fn render(&self, record: &BenchmarkRecord) -> Vec<String>;
}

/// Index parsed rows by function name, keeping the last occurrence
pub fn records_by_function(records: &[BenchmarkRecord]) -> HashMap<&str, &BenchmarkRecord> {
    records.iter().map(|r| (r.function.as_str(), r)).collect()
}

/// Expected functions that have no parsed row
pub fn missing_functions<'a, W: Workload + ?Sized>(
    workload: &'a W,
    records: &[BenchmarkRecord],
) -> Vec<&'a str> {
    let found = records_by_function(records);
    workload
        .expected_functions()
        .iter()
        .copied()
        .filter(|f| !found.contains_key(f))
        .collect()
}

/// Separator lines terminate or pad summary tables
fn is_separator(line: &str) -> bool {
    line.starts_with('-')
}
