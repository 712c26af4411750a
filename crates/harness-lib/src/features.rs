//! Feature extraction from the master raw dataset
//!
//! Reduces the long-format samples (one row per monitor tick) into one
//! feature row per run: final usage, usage trend, usage range and
//! volatility per node, free page and migration deltas, elapsed time, and
//! a one-hot encoding of the placement policy.
//!
//! Rows within a run are taken in file order; no timestamp sort is applied.

use crate::error::{HarnessError, Result};
use crate::models::{
    free_pages_column, mem_total_column, mem_used_column, FeatureRow, FEATURE_NODES,
    MIGRATION_COLUMN, POLICY_COLUMN, TIMESTAMP_COLUMN,
};
use crate::policy::PlacementPolicy;
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Run id column names the aggregator may have produced, in lookup order
pub const RUN_COLUMN_CANDIDATES: &[&str] = &["run_index", "stream_run"];

/// Feature rows plus the run id column name they were keyed by
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    pub run_column: String,
    pub rows: Vec<FeatureRow>,
}

impl FeatureSet {
    pub fn header(&self) -> Vec<String> {
        FeatureRow::header(&self.run_column)
    }

    /// Write the feature dataset, replacing any previous file
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        let mut writer = csv::Writer::from_path(path).map_err(|e| HarnessError::csv(path, e))?;
        writer
            .write_record(self.header())
            .map_err(|e| HarnessError::csv(path, e))?;
        for row in &self.rows {
            writer
                .write_record(row.to_record())
                .map_err(|e| HarnessError::csv(path, e))?;
        }
        writer.flush().map_err(|e| HarnessError::io(path, e))
    }
}

/// Column positions of everything the extractor reads
struct Columns {
    run: usize,
    policy: usize,
    timestamp: usize,
    used: [usize; FEATURE_NODES],
    total: [usize; FEATURE_NODES],
    free: [usize; FEATURE_NODES],
    migrated: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord, run_column: &str, source: &Path) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| HarnessError::MissingColumn {
                    path: source.to_path_buf(),
                    column: name.to_string(),
                })
        };
        let per_node = |column: fn(usize) -> String| -> Result<[usize; FEATURE_NODES]> {
            let mut out = [0; FEATURE_NODES];
            for (node, slot) in out.iter_mut().enumerate() {
                *slot = find(&column(node))?;
            }
            Ok(out)
        };

        Ok(Self {
            run: find(run_column)?,
            policy: find(POLICY_COLUMN)?,
            timestamp: find(TIMESTAMP_COLUMN)?,
            used: per_node(mem_used_column)?,
            total: per_node(mem_total_column)?,
            free: per_node(free_pages_column)?,
            migrated: find(MIGRATION_COLUMN)?,
        })
    }
}

/// One parsed monitor tick
#[derive(Debug, Clone)]
struct Sample {
    timestamp: f64,
    used: [f64; FEATURE_NODES],
    total: [f64; FEATURE_NODES],
    free: [i64; FEATURE_NODES],
    migrated: i64,
    policy: String,
}

impl Sample {
    /// mem_used / mem_total, undefined when the total is zero
    fn usage(&self, node: usize) -> Option<f64> {
        if self.total[node] == 0.0 {
            None
        } else {
            Some(self.used[node] / self.total[node])
        }
    }
}

/// Samples of one run in file order
#[derive(Debug)]
struct RunSamples {
    run_id: u32,
    samples: Vec<Sample>,
}

/// Batch transform from raw samples to per-run features
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    run_column: Option<String>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed run id column instead of auto-detecting it
    pub fn with_run_column(run_column: impl Into<String>) -> Self {
        Self {
            run_column: Some(run_column.into()),
        }
    }

    /// Read `input`, write the features to `output`, and return them
    pub fn extract_file(&self, input: &Path, output: &Path) -> Result<FeatureSet> {
        let features = self.extract_path(input)?;
        features.write_csv(output)?;
        info!(
            input = %input.display(),
            output = %output.display(),
            runs = features.rows.len(),
            "Wrote feature dataset"
        );
        Ok(features)
    }

    pub fn extract_path(&self, input: &Path) -> Result<FeatureSet> {
        let file = std::fs::File::open(input).map_err(|e| HarnessError::io(input, e))?;
        self.extract_reader(file, input)
    }

    /// Extract from any CSV source; `source` is only used in error messages
    pub fn extract_reader<R: Read>(&self, reader: R, source: &Path) -> Result<FeatureSet> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| HarnessError::csv(source, e))?
            .clone();
        let run_column = self.resolve_run_column(&headers, source)?;
        let columns = Columns::resolve(&headers, &run_column, source)?;

        let runs = group_runs(&mut csv_reader, &columns, &run_column, source)?;
        let rows: Vec<FeatureRow> = runs.iter().filter_map(summarize_run).collect();

        debug!(runs = rows.len(), run_column = %run_column, "Extracted features");
        Ok(FeatureSet { run_column, rows })
    }

    fn resolve_run_column(&self, headers: &StringRecord, source: &Path) -> Result<String> {
        if let Some(column) = &self.run_column {
            return Ok(column.clone());
        }
        RUN_COLUMN_CANDIDATES
            .iter()
            .find(|candidate| headers.iter().any(|h| h.trim() == **candidate))
            .map(|c| c.to_string())
            .ok_or_else(|| HarnessError::MissingColumn {
                path: source.to_path_buf(),
                column: RUN_COLUMN_CANDIDATES.join(" or "),
            })
    }
}

fn group_runs<R: Read>(
    reader: &mut csv::Reader<R>,
    columns: &Columns,
    run_column: &str,
    source: &Path,
) -> Result<Vec<RunSamples>> {
    let mut runs: Vec<RunSamples> = Vec::new();
    let mut slots: HashMap<u32, usize> = HashMap::new();
    let mut previous: Option<u32> = None;

    for record in reader.records() {
        let record = record.map_err(|e| HarnessError::csv(source, e))?;
        let row = RowReader {
            record: &record,
            line: record.position().map(|p| p.line()).unwrap_or(0),
            source,
        };

        let run_id: u32 = row.parse(columns.run, run_column)?;
        let mut sample = Sample {
            timestamp: row.parse(columns.timestamp, TIMESTAMP_COLUMN)?,
            used: [0.0; FEATURE_NODES],
            total: [0.0; FEATURE_NODES],
            free: [0; FEATURE_NODES],
            migrated: row.parse(columns.migrated, MIGRATION_COLUMN)?,
            policy: row.field(columns.policy, POLICY_COLUMN)?.to_string(),
        };
        for node in 0..FEATURE_NODES {
            sample.used[node] = row.parse(columns.used[node], &mem_used_column(node))?;
            sample.total[node] = row.parse(columns.total[node], &mem_total_column(node))?;
            sample.free[node] = row.parse(columns.free[node], &free_pages_column(node))?;
        }

        let slot = match slots.get(&run_id) {
            Some(&slot) => {
                if previous != Some(run_id) {
                    warn!(run = run_id, line = row.line, "Samples for run are not contiguous");
                }
                slot
            }
            None => {
                runs.push(RunSamples {
                    run_id,
                    samples: Vec::new(),
                });
                slots.insert(run_id, runs.len() - 1);
                runs.len() - 1
            }
        };
        runs[slot].samples.push(sample);
        previous = Some(run_id);
    }

    Ok(runs)
}

/// Typed access to the fields of one raw record
struct RowReader<'a> {
    record: &'a StringRecord,
    line: u64,
    source: &'a Path,
}

impl<'a> RowReader<'a> {
    fn invalid(&self, column: &str, value: &str) -> HarnessError {
        HarnessError::InvalidValue {
            path: self.source.to_path_buf(),
            line: self.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn field(&self, idx: usize, column: &str) -> Result<&'a str> {
        self.record
            .get(idx)
            .map(str::trim)
            .ok_or_else(|| self.invalid(column, ""))
    }

    fn parse<T: FromStr>(&self, idx: usize, column: &str) -> Result<T> {
        let raw = self.field(idx, column)?;
        raw.parse().map_err(|_| self.invalid(column, raw))
    }
}

fn summarize_run(run: &RunSamples) -> Option<FeatureRow> {
    let first = run.samples.first()?;
    let last = run.samples.last()?;

    let mut row = FeatureRow {
        run_id: run.run_id,
        run_timestep: last.timestamp
            - run
                .samples
                .iter()
                .map(|s| s.timestamp)
                .fold(f64::INFINITY, f64::min),
        usage: [None; FEATURE_NODES],
        trend: [None; FEATURE_NODES],
        min_usage: [None; FEATURE_NODES],
        max_usage: [None; FEATURE_NODES],
        volatility: [None; FEATURE_NODES],
        free_pages_change: [0; FEATURE_NODES],
        total_page_migrations: last.migrated - first.migrated,
        first_touch: 0,
        interleave: 0,
        preferred_0: 0,
        preferred_1: 0,
    };

    for node in 0..FEATURE_NODES {
        let usage: Vec<f64> = run.samples.iter().filter_map(|s| s.usage(node)).collect();
        if usage.len() < run.samples.len() {
            warn!(
                run = run.run_id,
                node,
                undefined = run.samples.len() - usage.len(),
                "mem_total is zero; usage undefined for those samples"
            );
        }

        row.usage[node] = last.usage(node);
        row.trend[node] = match (usage.first(), usage.last()) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        };
        row.min_usage[node] = usage.iter().copied().reduce(f64::min);
        row.max_usage[node] = usage.iter().copied().reduce(f64::max);
        row.volatility[node] = sample_std_dev(&usage);
        row.free_pages_change[node] = last.free[node] - first.free[node];
    }

    let policy = PlacementPolicy::parse(&last.policy);
    if policy.is_none() {
        warn!(run = run.run_id, policy = %last.policy, "Unrecognized placement policy, one-hot flags left at zero");
    }
    let [first_touch, interleave, preferred_0, preferred_1] = PlacementPolicy::one_hot(policy);
    row.first_touch = first_touch;
    row.interleave = interleave;
    row.preferred_0 = preferred_0;
    row.preferred_1 = preferred_1;

    Some(row)
}

/// Sample standard deviation (n - 1); undefined below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt())
}

/// Path the feature dataset is written to when none is given
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "raw".to_string());
    input.with_file_name(format!("{}_features.csv", stem))
}
