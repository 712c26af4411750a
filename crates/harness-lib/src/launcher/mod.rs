//! External process launching
//!
//! The monitor wraps the workload: it is started inside the run directory,
//! samples NUMA counters while the workload runs, and writes its raw CSV
//! next to itself before exiting. Everything that touches real binaries sits
//! behind [`ProcessLauncher`] so the rest of the pipeline can be driven from
//! recorded fixtures.

mod binary;
mod topology;

pub use binary::{expand_home, resolve_program, validate_binary};
pub use topology::{detect_numa_nodes, NODE_ROOT};

use crate::error::{HarnessError, Result};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, info, warn};

/// Flag that puts the monitor into "run this command" mode
pub const RECORD_FLAG: &str = "-r";

/// Everything needed to start one monitored run
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub run_index: u32,
    pub run_directory: PathBuf,
    pub monitor: PathBuf,
    pub node_count: usize,
    pub interval_secs: f64,
    pub record_flag: String,
    pub workload_command: Vec<String>,
    /// File name the monitor writes inside the run directory
    pub output_file: String,
}

impl LaunchRequest {
    /// Monitor arguments: node count, interval, record flag, workload command
    pub fn monitor_args(&self) -> Vec<String> {
        let mut args = vec![
            self.node_count.to_string(),
            self.interval_secs.to_string(),
            self.record_flag.clone(),
        ];
        args.extend(self.workload_command.iter().cloned());
        args
    }

    pub fn raw_csv_path(&self) -> PathBuf {
        self.run_directory.join(&self.output_file)
    }
}

/// Captured result of a successful run
#[derive(Debug, Clone, Default)]
pub struct LaunchOutput {
    pub raw_csv: PathBuf,
    pub stdout: String,
    pub stderr: String,
}

/// Capability to run the monitor + workload pair for one run
pub trait ProcessLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutput>;
}

/// Launcher that spawns real processes and blocks until they exit
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutput> {
        std::fs::create_dir_all(&request.run_directory)
            .map_err(|e| HarnessError::io(&request.run_directory, e))?;

        let program = request.monitor.display().to_string();
        let args = request.monitor_args();

        info!(
            run = request.run_index,
            dir = %request.run_directory.display(),
            "Collecting NUMA stats"
        );
        debug!(run = request.run_index, program = %program, args = ?args, "Spawning monitor");

        let output = Command::new(&request.monitor)
            .args(&args)
            .current_dir(&request.run_directory)
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stdout.is_empty() {
            debug!(run = request.run_index, stdout = %stdout, "Workload output");
        }
        if !stderr.is_empty() {
            warn!(run = request.run_index, stderr = %stderr.trim_end(), "Monitor wrote to stderr");
        }

        if !output.status.success() {
            return Err(HarnessError::Process {
                run_index: request.run_index,
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        Ok(LaunchOutput {
            raw_csv: request.raw_csv_path(),
            stdout,
            stderr,
        })
    }
}
