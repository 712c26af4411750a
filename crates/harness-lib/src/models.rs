//! Core data models for the harness

use serde::Serialize;
use std::path::PathBuf;

/// Column the aggregator appends with the policy label of each sample
pub const POLICY_COLUMN: &str = "mem_policy";

/// Raw monitor columns the feature extractor depends on
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const MIGRATION_COLUMN: &str = "numa_pages_migrated";

/// Number of NUMA nodes the feature vector covers
pub const FEATURE_NODES: usize = 2;

pub fn mem_used_column(node: usize) -> String {
    format!("node_{}_mem_used", node)
}

pub fn mem_total_column(node: usize) -> String {
    format!("node_{}_mem_total", node)
}

pub fn free_pages_column(node: usize) -> String {
    format!("node_{}_nr_free_pages", node)
}

/// One iteration of the batch loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub run_index: u32,
    pub policy_name: String,
    pub run_directory: PathBuf,
}

impl Run {
    pub fn new(run_index: u32, policy_name: impl Into<String>, output_dir: &std::path::Path) -> Self {
        Self {
            run_index,
            policy_name: policy_name.into(),
            run_directory: output_dir.join(format!("run_{:02}", run_index)),
        }
    }
}

/// One parsed line of a workload's summary table
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub function: String,
    pub rate: f64,
    pub avg_time: f64,
    pub min_time: Option<f64>,
    pub max_time: Option<f64>,
}

/// Per-run feature vector derived from the raw samples of a single run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub run_id: u32,
    pub run_timestep: f64,
    pub usage: [Option<f64>; FEATURE_NODES],
    pub trend: [Option<f64>; FEATURE_NODES],
    pub min_usage: [Option<f64>; FEATURE_NODES],
    pub max_usage: [Option<f64>; FEATURE_NODES],
    pub volatility: [Option<f64>; FEATURE_NODES],
    pub free_pages_change: [i64; FEATURE_NODES],
    pub total_page_migrations: i64,
    pub first_touch: u8,
    pub interleave: u8,
    pub preferred_0: u8,
    pub preferred_1: u8,
}

impl FeatureRow {
    /// Column names in output order, with the run id column named after the input
    pub fn header(run_column: &str) -> Vec<String> {
        let mut header = vec![run_column.to_string(), "run_timestep".to_string()];
        for stat in ["usage", "trend", "min_usage", "max_usage", "volatility", "free_pages_change"] {
            for node in 0..FEATURE_NODES {
                header.push(format!("node_{}_{}", node, stat));
            }
        }
        header.extend(
            ["total_page_migrations", "first-touch", "interleave", "preferred_0", "preferred_1"]
                .iter()
                .map(|s| s.to_string()),
        );
        header
    }

    /// Field values matching [`FeatureRow::header`]; undefined statistics are empty
    pub fn to_record(&self) -> Vec<String> {
        let mut fields = vec![self.run_id.to_string(), self.run_timestep.to_string()];
        for stat in [
            &self.usage,
            &self.trend,
            &self.min_usage,
            &self.max_usage,
            &self.volatility,
        ] {
            fields.extend(stat.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        }
        fields.extend(self.free_pages_change.iter().map(|v| v.to_string()));
        fields.push(self.total_page_migrations.to_string());
        for flag in [self.first_touch, self.interleave, self.preferred_0, self.preferred_1] {
            fields.push(flag.to_string());
        }
        fields
    }
}
