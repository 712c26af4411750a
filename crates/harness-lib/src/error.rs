//! Error kinds for the harness
//!
//! Every variant here is fatal for the batch. Data warnings (empty run
//! output, missing benchmark functions, unknown policies) are logged and
//! counted instead of being raised.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("{role} binary not found at {}", path.display())]
    MissingBinary { role: String, path: PathBuf },

    #[error("{role} binary at {} lacks execute permission", path.display())]
    NotExecutable { role: String, path: PathBuf },

    #[error("input {} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("no NUMA nodes detected under {}", root.display())]
    Topology { root: PathBuf },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("run {run_index}: monitor exited with {status}: {stderr}")]
    Process {
        run_index: u32,
        status: String,
        stderr: String,
    },

    #[error("run {run_index}: expected monitor output at {}", path.display())]
    MissingRunOutput { run_index: u32, path: PathBuf },

    #[error("header mismatch in {}\nexisting: {existing}\nexpected: {expected}", path.display())]
    SchemaConsistency {
        path: PathBuf,
        existing: String,
        expected: String,
    },

    #[error("{} line {line}: invalid {column} value '{value}'", path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Errors that stem from validating the environment before any run starts
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::MissingBinary { .. }
                | Self::NotExecutable { .. }
                | Self::Topology { .. }
        )
    }
}
