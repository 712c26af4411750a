//! Batch orchestration
//!
//! Runs the workload once per run index, strictly one after another, and
//! merges each run's outputs into the aggregate and metrics datasets before
//! the next run starts. NUMA counters are machine-global, so runs must never
//! overlap.

use crate::aggregate::{AppendOutcome, RawAggregator};
use crate::error::{HarnessError, Result};
use crate::launcher::{resolve_program, validate_binary, LaunchRequest, ProcessLauncher, RECORD_FLAG};
use crate::models::Run;
use crate::observability::{HarnessMetrics, StructuredLogger};
use crate::policy::{append_suffix_to_path, PlacementPolicy, PolicyCycle};
use crate::workload::{MetricsOutcome, MetricsWriter, Workload};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

/// Settings for one batch invocation
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub runs: u32,
    pub start_run: u32,
    pub interval_secs: f64,
    pub record_flag: String,
    pub node_count: usize,
    pub monitor: PathBuf,
    pub output_dir: PathBuf,
    /// Aggregate raw dataset path before the batch suffix is applied
    pub aggregate_file: PathBuf,
    /// Metrics dataset path before the batch suffix is applied
    pub metrics_file: PathBuf,
    /// Prefix the workload with the numactl invocation for its policy
    pub enforce_policy: bool,
    /// numactl executable; a bare name is looked up on `$PATH`
    pub numactl: PathBuf,
}

impl BatchConfig {
    /// Run indices must be positive and the last one must fit in a `u32`
    pub fn validate(&self) -> Result<()> {
        if self.start_run == 0 {
            return Err(HarnessError::Configuration(
                "start run must be at least 1".to_string(),
            ));
        }
        if self.start_run.checked_add(self.runs).is_none() {
            return Err(HarnessError::Configuration(format!(
                "{} runs starting at {} exceed the largest run index",
                self.runs, self.start_run
            )));
        }
        Ok(())
    }

    /// Whether any policy in the cycle is enforced through numactl
    pub fn needs_numactl(&self, cycle: &PolicyCycle) -> bool {
        self.enforce_policy
            && cycle
                .policies()
                .iter()
                .filter_map(|p| PlacementPolicy::parse(p))
                .any(|p| !p.command_prefix().is_empty())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: 10,
            start_run: 1,
            interval_secs: 0.1,
            record_flag: RECORD_FLAG.to_string(),
            node_count: 1,
            monitor: PathBuf::from("numa_stat_logger"),
            output_dir: PathBuf::from("run_outputs"),
            aggregate_file: PathBuf::from("run_outputs/raw.csv"),
            metrics_file: PathBuf::from("run_outputs/metrics.csv"),
            enforce_policy: true,
            numactl: PathBuf::from("numactl"),
        }
    }
}

/// What a finished batch produced
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub workload: String,
    pub started_at: DateTime<Utc>,
    pub runs_completed: u32,
    pub samples_appended: usize,
    pub warnings: usize,
    pub aggregate_file: PathBuf,
    pub metrics_file: PathBuf,
}

/// Validate the batch settings and every binary it will run
///
/// Returns the config with the monitor and numactl paths resolved.
pub fn preflight<W: Workload + ?Sized>(
    config: &BatchConfig,
    cycle: &PolicyCycle,
    workload: &W,
) -> Result<BatchConfig> {
    config.validate()?;
    for (role, path) in workload.required_binaries() {
        validate_binary(role, path)?;
    }

    let mut resolved = config.clone();
    resolved.monitor = validate_binary("monitor", &config.monitor)?;
    if config.needs_numactl(cycle) {
        resolved.numactl = validate_binary("numactl", &resolve_program(&config.numactl))?;
    }
    Ok(resolved)
}

/// Aggregate and metrics paths for this batch, suffixed with its start run and policies
pub fn prepare_outputs(config: &BatchConfig, cycle: &PolicyCycle) -> (PathBuf, PathBuf) {
    let suffix = cycle.output_suffix(config.start_run);
    (
        append_suffix_to_path(&config.aggregate_file, &suffix),
        append_suffix_to_path(&config.metrics_file, &suffix),
    )
}

/// Sequential batch runner, generic over the workload strategy and launcher
pub struct Orchestrator<W: Workload, L: ProcessLauncher> {
    config: BatchConfig,
    cycle: PolicyCycle,
    workload: W,
    launcher: L,
    aggregator: RawAggregator,
    metrics_file: PathBuf,
    metrics: HarnessMetrics,
    logger: StructuredLogger,
}

impl<W: Workload, L: ProcessLauncher> Orchestrator<W, L> {
    pub fn new(config: BatchConfig, cycle: PolicyCycle, workload: W, launcher: L) -> Self {
        let (aggregate_file, metrics_file) = prepare_outputs(&config, &cycle);
        let aggregator = RawAggregator::new(aggregate_file, workload.run_column());
        let logger = StructuredLogger::new(workload.name());

        Self {
            config,
            cycle,
            workload,
            launcher,
            aggregator,
            metrics_file,
            metrics: HarnessMetrics::new(),
            logger,
        }
    }

    pub fn aggregate_file(&self) -> &Path {
        self.aggregator.destination()
    }

    pub fn metrics_file(&self) -> &Path {
        &self.metrics_file
    }

    /// Workload command for one run, prefixed with its placement enforcement
    fn workload_command(&self, policy_name: &str, offset: usize, warnings: &mut usize) -> Vec<String> {
        let mut command = Vec::new();
        if self.config.enforce_policy {
            match PlacementPolicy::parse(policy_name) {
                Some(policy) => {
                    let mut prefix = policy.command_prefix();
                    if let Some(program) = prefix.first_mut() {
                        *program = self.config.numactl.display().to_string();
                    }
                    command.extend(prefix);
                }
                None => {
                    warn!(policy = %policy_name, "Unknown placement policy, running without numactl");
                    self.metrics.inc_data_warning("unknown_policy");
                    *warnings += 1;
                }
            }
        }
        command.extend(self.workload.command(offset));
        command
    }

    /// Execute every run; the first fatal error aborts the remaining batch
    pub fn run_batch(&self) -> Result<BatchSummary> {
        self.config.validate()?;
        let mut summary = BatchSummary {
            workload: self.workload.name().to_string(),
            started_at: Utc::now(),
            runs_completed: 0,
            samples_appended: 0,
            warnings: 0,
            aggregate_file: self.aggregate_file().to_path_buf(),
            metrics_file: self.metrics_file.clone(),
        };

        self.logger.log_batch_started(
            self.config.node_count,
            self.config.runs,
            self.config.start_run,
            self.cycle.policies(),
        );

        for offset in 0..self.config.runs {
            let run_index = self.config.start_run + offset;
            if let Err(e) = self.run_once(run_index, offset as usize, &mut summary) {
                self.logger.log_batch_aborted(run_index, &e);
                return Err(e);
            }
        }

        self.logger.log_batch_finished(
            summary.runs_completed,
            self.aggregate_file(),
            &self.metrics_file,
        );
        Ok(summary)
    }

    fn run_once(&self, run_index: u32, offset: usize, summary: &mut BatchSummary) -> Result<()> {
        let run = Run::new(
            run_index,
            self.cycle.policy_for_run(run_index),
            &self.config.output_dir,
        );

        let request = LaunchRequest {
            run_index,
            run_directory: run.run_directory.clone(),
            monitor: self.config.monitor.clone(),
            node_count: self.config.node_count,
            interval_secs: self.config.interval_secs,
            record_flag: self.config.record_flag.clone(),
            workload_command: self.workload_command(&run.policy_name, offset, &mut summary.warnings),
            output_file: self.workload.monitor_output().to_string(),
        };

        let started = Instant::now();
        let output = self.launcher.launch(&request)?;
        let duration = started.elapsed().as_secs_f64();

        let samples = match self
            .aggregator
            .append_run(&output.raw_csv, &run.policy_name, run_index)?
        {
            AppendOutcome::Appended { rows } => rows,
            AppendOutcome::SkippedEmpty => {
                self.metrics.inc_data_warning("empty_run_output");
                summary.warnings += 1;
                0
            }
        };

        let records = self.workload.parse(&output.stdout);
        let outcome = MetricsWriter::new(&self.metrics_file, &self.workload).append(
            run_index,
            &run.policy_name,
            &records,
        )?;
        match &outcome {
            MetricsOutcome::MissingSummary => self.metrics.inc_data_warning("missing_summary"),
            MetricsOutcome::Written { missing } if !missing.is_empty() => {
                self.metrics.inc_data_warning("missing_functions")
            }
            MetricsOutcome::Written { .. } => {}
        }
        summary.warnings += outcome.warnings();

        summary.runs_completed += 1;
        summary.samples_appended += samples;
        self.metrics.observe_run_duration(duration);
        self.metrics.inc_runs_completed(&run.policy_name);
        self.metrics.add_samples_appended(samples as u64);
        self.logger
            .log_run_completed(run_index, &run.policy_name, samples, duration);

        Ok(())
    }
}
