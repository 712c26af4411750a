//! Raw sample aggregation
//!
//! Merges one run's raw monitor CSV into the master raw dataset, tagging every
//! row with the run's policy label and run index. Rows are passed through as
//! written by the monitor.

use crate::error::{HarnessError, Result};
use crate::models::POLICY_COLUMN;
use crate::schema;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of merging one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended { rows: usize },
    /// Run output was empty; nothing was written
    SkippedEmpty,
}

/// Append-only writer for the master raw dataset
#[derive(Debug, Clone)]
pub struct RawAggregator {
    destination: PathBuf,
    run_column: String,
}

impl RawAggregator {
    pub fn new(destination: impl Into<PathBuf>, run_column: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            run_column: run_column.into(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Header of the master dataset for a given monitor header
    pub fn augmented_header(&self, base_header: &str) -> String {
        format!("{},{},{}", base_header, POLICY_COLUMN, self.run_column)
    }

    /// `<policy>,<run>` as CSV fields; the policy label is quoted when it needs to be
    fn row_tag(&self, policy_name: &str, run_index: u32) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        let run = run_index.to_string();
        writer
            .write_record([policy_name, run.as_str()])
            .map_err(|e| HarnessError::csv(&self.destination, e))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| HarnessError::io(&self.destination, e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\n').to_string())
    }

    /// Merge the rows of `run_csv` into the master dataset
    pub fn append_run(&self, run_csv: &Path, policy_name: &str, run_index: u32) -> Result<AppendOutcome> {
        if !run_csv.is_file() {
            return Err(HarnessError::MissingRunOutput {
                run_index,
                path: run_csv.to_path_buf(),
            });
        }

        let content = fs::read_to_string(run_csv).map_err(|e| HarnessError::io(run_csv, e))?;
        let mut lines = content.trim().lines();

        let base_header = match lines.next() {
            Some(header) => header.trim_end_matches('\r'),
            None => {
                warn!(run = run_index, path = %run_csv.display(), "Run output is empty, skipping");
                return Ok(AppendOutcome::SkippedEmpty);
            }
        };

        schema::ensure_header(&self.destination, &self.augmented_header(base_header))?;

        let tag = self.row_tag(policy_name, run_index)?;
        let rows = schema::append_lines(
            &self.destination,
            lines.map(|row| format!("{},{}", row.trim_end_matches('\r'), tag)),
        )?;

        debug!(
            run = run_index,
            rows,
            destination = %self.destination.display(),
            "Appended raw samples"
        );
        Ok(AppendOutcome::Appended { rows })
    }
}
