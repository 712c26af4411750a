//! NUMA placement-policy harness
//!
//! Runs a workload repeatedly under a NUMA monitor, cycling memory placement
//! policies across runs, and reduces the collected samples into one feature
//! row per run.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{extract, run, topology};
use harness_lib::HarnessError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// NUMA placement-policy harness
#[derive(Parser)]
#[command(name = "numa-harness")]
#[command(author, version, about = "NUMA placement-policy harness", long_about = None)]
pub struct Cli {
    /// Config file (TOML or JSON); NUMA_HARNESS_* env vars override it
    #[arg(long, global = true, env = "NUMA_HARNESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch of monitored workload runs
    Run(run::RunArgs),

    /// Reduce an aggregate raw dataset to one feature row per run
    Extract {
        /// Aggregate raw dataset
        #[arg(long, short)]
        input: PathBuf,

        /// Feature dataset to write (defaults to <input>_features.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Run id column (auto-detected when omitted)
        #[arg(long)]
        run_column: Option<String>,

        /// Number of feature rows to print
        #[arg(long, default_value_t = 5)]
        preview: usize,
    },

    /// Show the detected NUMA node count
    Topology {
        /// sysfs directory holding the node<N> entries
        #[arg(long)]
        node_root: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = config::HarnessConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run::run_batch(config, args, cli.format),
        Commands::Extract {
            input,
            output,
            run_column,
            preview,
        } => extract::extract_features(&input, output, run_column, preview, cli.format),
        Commands::Topology { node_root } => {
            topology::show_topology(&node_root.unwrap_or(config.node_root), cli.format)
        }
    }
}

/// 1 for bad input or topology, 2 for everything else
fn exit_code(error: &anyhow::Error) -> ExitCode {
    let validation = error.chain().any(|cause| {
        cause
            .downcast_ref::<HarnessError>()
            .is_some_and(HarnessError::is_validation)
            || cause.is::<::config::ConfigError>()
    });
    if validation {
        ExitCode::from(1)
    } else {
        ExitCode::from(2)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            exit_code(&e)
        }
    }
}
