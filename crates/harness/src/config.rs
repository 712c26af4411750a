//! Harness configuration
//!
//! Layered as defaults, then an optional config file, then `NUMA_HARNESS_*`
//! environment variables. Command-line flags are applied on top by the
//! subcommands.

use anyhow::{Context, Result};
use harness_lib::launcher::{NODE_ROOT, RECORD_FLAG};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings shared by every workload
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// First run index of a batch
    #[serde(default = "default_start_run")]
    pub start_run: u32,

    /// Monitor sampling interval in seconds
    #[serde(default = "default_interval")]
    pub interval_secs: f64,

    /// Flag telling the monitor to record to its CSV
    #[serde(default = "default_record_flag")]
    pub record_flag: String,

    /// Placement policies cycled across runs
    #[serde(default = "default_policies")]
    pub policies: Vec<String>,

    /// NUMA monitor executable
    #[serde(default = "default_monitor_binary")]
    pub monitor_binary: PathBuf,

    /// sysfs directory holding the `node<N>` entries
    #[serde(default = "default_node_root")]
    pub node_root: PathBuf,

    /// Prefix workloads with numactl for their policy
    #[serde(default = "default_enforce_policy")]
    pub enforce_policy: bool,

    /// numactl used to enforce policies; a bare name is looked up on PATH
    #[serde(default = "default_numactl")]
    pub numactl: PathBuf,

    /// Prometheus textfile written after a batch
    #[serde(default)]
    pub metrics_export: Option<PathBuf>,

    #[serde(default = "WorkloadConfig::stream")]
    pub stream: WorkloadConfig,

    #[serde(default = "WorkloadConfig::db_bench")]
    pub db_bench: WorkloadConfig,
}

/// Per-workload binaries and output locations
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    pub runs: u32,
    /// STREAM binary, or the db_bench helper script
    pub binary: PathBuf,
    /// db_bench executable the helper script calls
    #[serde(default)]
    pub db_bench_binary: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub aggregate_file: PathBuf,
    pub metrics_file: PathBuf,
}

impl WorkloadConfig {
    pub fn stream() -> Self {
        Self {
            runs: 10,
            binary: PathBuf::from("NUMA-STREAM/stream-gcc"),
            db_bench_binary: None,
            output_dir: PathBuf::from("stream_run_outputs"),
            aggregate_file: PathBuf::from("stream_run_outputs/stream_raw_log.csv"),
            metrics_file: PathBuf::from("stream_run_outputs/stream_feature_log.csv"),
        }
    }

    pub fn db_bench() -> Self {
        Self {
            runs: 100,
            binary: PathBuf::from("~/numa-vmstat-logger/data_collection/rocksdb/benchmark_script.sh"),
            db_bench_binary: Some(PathBuf::from("~/rocksdb/db_bench")),
            output_dir: PathBuf::from("rocksdb_logs"),
            aggregate_file: PathBuf::from("rocksdb_logs/raw.csv"),
            metrics_file: PathBuf::from("rocksdb_logs/features.csv"),
        }
    }
}

fn default_start_run() -> u32 {
    1
}

fn default_interval() -> f64 {
    0.1
}

fn default_record_flag() -> String {
    RECORD_FLAG.to_string()
}

fn default_policies() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_monitor_binary() -> PathBuf {
    PathBuf::from("~/numa-vmstat-logger/src/numa_stat_logger")
}

fn default_node_root() -> PathBuf {
    PathBuf::from(NODE_ROOT)
}

fn default_numactl() -> PathBuf {
    PathBuf::from("numactl")
}

fn default_enforce_policy() -> bool {
    true
}

impl HarnessConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("NUMA_HARNESS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("policies")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid harness configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_sources() {
        let config: HarnessConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.start_run, 1);
        assert_eq!(config.policies, vec!["default"]);
        assert!(config.enforce_policy);
        assert_eq!(config.stream.runs, 10);
        assert_eq!(config.db_bench.runs, 100);
        assert_eq!(config.node_root, PathBuf::from("/sys/devices/system/node"));
        assert_eq!(config.numactl, PathBuf::from("numactl"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("harness.toml");
        std::fs::write(
            &path,
            r#"
interval_secs = 0.5
policies = ["interleave_all", "preferred_node1"]
enforce_policy = false

[stream]
runs = 4
binary = "/opt/stream-gcc"
output_dir = "out"
aggregate_file = "out/raw.csv"
metrics_file = "out/metrics.csv"
"#,
        )
        .unwrap();

        let config = HarnessConfig::load(Some(&path)).unwrap();

        assert_eq!(config.interval_secs, 0.5);
        assert_eq!(config.policies, vec!["interleave_all", "preferred_node1"]);
        assert!(!config.enforce_policy);
        assert_eq!(config.stream.runs, 4);
        assert_eq!(config.stream.binary, PathBuf::from("/opt/stream-gcc"));
        assert_eq!(config.db_bench.output_dir, PathBuf::from("rocksdb_logs"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(HarnessConfig::load(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }
}
