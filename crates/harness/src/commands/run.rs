//! Batch run command

use crate::config::{HarnessConfig, WorkloadConfig};
use crate::output::{self, OutputFormat};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use harness_lib::launcher::{detect_numa_nodes, expand_home, SystemLauncher};
use harness_lib::orchestrator::{preflight, BatchConfig, BatchSummary, Orchestrator};
use harness_lib::policy::PolicyCycle;
use harness_lib::workload::{DbBenchWorkload, StreamWorkload, Workload};
use harness_lib::HarnessMetrics;
use std::path::PathBuf;
use tracing::info;

/// Benchmark driven by the monitor
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum WorkloadKind {
    /// STREAM memory bandwidth benchmark
    Stream,
    /// RocksDB db_bench through its helper script
    DbBench,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Workload to benchmark
    #[arg(long, short, value_enum)]
    pub workload: WorkloadKind,

    /// Number of runs in this batch
    #[arg(long)]
    pub runs: Option<u32>,

    /// Index of the first run
    #[arg(long)]
    pub start_run: Option<u32>,

    /// Monitor sampling interval in seconds
    #[arg(long)]
    pub interval: Option<f64>,

    /// Placement policies to cycle through (space or comma separated)
    #[arg(long, num_args = 1..)]
    pub policies: Vec<String>,

    /// NUMA monitor executable
    #[arg(long)]
    pub monitor_binary: Option<PathBuf>,

    /// STREAM binary or db_bench helper script
    #[arg(long)]
    pub workload_binary: Option<PathBuf>,

    /// db_bench executable called by the helper script
    #[arg(long)]
    pub db_bench_binary: Option<PathBuf>,

    /// Directory holding the per-run working directories
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Aggregate raw dataset (suffixed per batch)
    #[arg(long)]
    pub aggregate_file: Option<PathBuf>,

    /// Benchmark metrics dataset (suffixed per batch)
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Run workloads without a numactl placement prefix
    #[arg(long)]
    pub no_enforce_policy: bool,

    /// Write Prometheus batch metrics to this textfile
    #[arg(long)]
    pub metrics_export: Option<PathBuf>,

    /// sysfs directory holding the node<N> entries
    #[arg(long)]
    pub node_root: Option<PathBuf>,
}

/// Everything a batch needs once config and flags are merged
#[derive(Debug)]
struct RunSettings {
    batch: BatchConfig,
    workload: WorkloadConfig,
    policies: Vec<String>,
    node_root: PathBuf,
    metrics_export: Option<PathBuf>,
}

impl RunSettings {
    fn resolve(config: HarnessConfig, args: RunArgs) -> Self {
        let mut workload = match args.workload {
            WorkloadKind::Stream => config.stream,
            WorkloadKind::DbBench => config.db_bench,
        };
        if let Some(runs) = args.runs {
            workload.runs = runs;
        }
        if let Some(binary) = args.workload_binary {
            workload.binary = binary;
        }
        if args.db_bench_binary.is_some() {
            workload.db_bench_binary = args.db_bench_binary;
        }
        if let Some(dir) = args.output_dir {
            workload.output_dir = dir;
        }
        if let Some(file) = args.aggregate_file {
            workload.aggregate_file = file;
        }
        if let Some(file) = args.metrics_file {
            workload.metrics_file = file;
        }

        let batch = BatchConfig {
            runs: workload.runs,
            start_run: args.start_run.unwrap_or(config.start_run),
            interval_secs: args.interval.unwrap_or(config.interval_secs),
            record_flag: config.record_flag,
            node_count: 0,
            monitor: expand_home(&args.monitor_binary.unwrap_or(config.monitor_binary)),
            output_dir: workload.output_dir.clone(),
            aggregate_file: workload.aggregate_file.clone(),
            metrics_file: workload.metrics_file.clone(),
            enforce_policy: config.enforce_policy && !args.no_enforce_policy,
            numactl: config.numactl,
        };

        Self {
            batch,
            workload,
            policies: if args.policies.is_empty() {
                config.policies
            } else {
                args.policies
            },
            node_root: args.node_root.unwrap_or(config.node_root),
            metrics_export: args.metrics_export.or(config.metrics_export),
        }
    }
}

pub fn run_batch(config: HarnessConfig, args: RunArgs, format: OutputFormat) -> Result<()> {
    let kind = args.workload;
    let settings = RunSettings::resolve(config, args);

    match kind {
        WorkloadKind::Stream => {
            let workload = StreamWorkload::new(expand_home(&settings.workload.binary));
            execute(settings, workload, format)
        }
        WorkloadKind::DbBench => {
            let mut workload = DbBenchWorkload::new(
                expand_home(&settings.workload.binary),
                settings.batch.runs as usize,
            );
            if let Some(db_bench) = &settings.workload.db_bench_binary {
                workload = workload.with_db_bench(expand_home(db_bench));
            }
            execute(settings, workload, format)
        }
    }
}

fn execute<W: Workload>(mut settings: RunSettings, workload: W, format: OutputFormat) -> Result<()> {
    let cycle = PolicyCycle::new(&settings.policies);
    settings.batch = preflight(&settings.batch, &cycle, &workload)?;
    settings.batch.node_count = detect_numa_nodes(&settings.node_root)?;

    info!(
        workload = workload.name(),
        policies = %cycle.policies().join(","),
        enforce = settings.batch.enforce_policy,
        "Starting batch"
    );

    let orchestrator = Orchestrator::new(settings.batch, cycle, workload, SystemLauncher::new());
    let result = orchestrator.run_batch();

    // Export whatever was recorded, including for an aborted batch
    if let Some(path) = &settings.metrics_export {
        HarnessMetrics::new()
            .export(path)
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    }

    let summary = result.context("Batch aborted")?;
    print_summary(&summary, format);
    Ok(())
}

fn print_summary(summary: &BatchSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(summary),
        OutputFormat::Table => {
            output::print_success(&format!(
                "Completed {} {} runs ({} samples)",
                summary.runs_completed, summary.workload, summary.samples_appended
            ));
            output::print_info(&format!("Raw samples: {}", summary.aggregate_file.display()));
            output::print_info(&format!("Benchmark metrics: {}", summary.metrics_file.display()));
            if summary.warnings > 0 {
                output::print_warning(&format!(
                    "{} data warnings, see the log for details",
                    summary.warnings
                ));
            }
        }
    }
}
