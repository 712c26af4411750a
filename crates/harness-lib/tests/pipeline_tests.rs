//! End-to-end pipeline tests driven by recorded monitor and workload output

use harness_lib::features::FeatureExtractor;
use harness_lib::launcher::{LaunchOutput, LaunchRequest, ProcessLauncher};
use harness_lib::orchestrator::{BatchConfig, Orchestrator};
use harness_lib::policy::PolicyCycle;
use harness_lib::workload::StreamWorkload;
use harness_lib::{HarnessError, Result};
use std::fs;
use tempfile::TempDir;

const MONITOR_HEADER: &str = "timestamp,node_0_mem_total,node_0_mem_used,node_1_mem_total,node_1_mem_used,\
node_0_nr_free_pages,node_0_numa_hit,node_0_numa_miss,node_0_numa_foreign,node_0_numa_interleave,node_0_numa_local,node_0_numa_other,\
node_1_nr_free_pages,node_1_numa_hit,node_1_numa_miss,node_1_numa_foreign,node_1_numa_interleave,node_1_numa_local,node_1_numa_other,\
numa_pte_updates,numa_huge_pte_updates,numa_pages_migrated,pgmigrate_success,pgmigrate_fail,thp_migration_success,thp_migration_fail,thp_migration_split";

const STREAM_STDOUT: &str = "\
-------------------------------------------------------------
Function      Rate (MB/s)   Avg time     Min time     Max time
Copy:          11538.4637     0.0139     0.0139     0.0140
Scale:         11437.2185     0.0140     0.0140     0.0141
Add:           12788.6741     0.0188     0.0188     0.0189
Triad:         12781.0426     0.0188     0.0188     0.0189
-------------------------------------------------------------
";

/// Replays a fixed sample series per run instead of spawning processes
struct RecordedLauncher;

impl RecordedLauncher {
    /// Node 0 usage climbs 0.5 → 0.8; migrations grow by 40 per run
    fn samples(run_index: u32) -> String {
        let base_ts = 1_700_000_000.0 + run_index as f64 * 100.0;
        let migrated = 100 * run_index as u64;
        let ticks = [(0.0, 500, 100, migrated), (0.1, 650, 90, migrated), (0.2, 800, 80, migrated + 40)];

        let mut csv = format!("{}\n", MONITOR_HEADER);
        for (dt, used, free, migrated) in ticks {
            csv.push_str(&format!(
                "{:.9},1000,{},1000,{},{},0,0,0,0,0,0,{},0,0,0,0,0,0,0,0,{},0,0,0,0,0\n",
                base_ts + dt,
                used,
                used,
                free,
                free * 2,
                migrated
            ));
        }
        csv
    }
}

impl ProcessLauncher for RecordedLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<LaunchOutput> {
        fs::create_dir_all(&request.run_directory)
            .map_err(|e| HarnessError::Configuration(e.to_string()))?;
        fs::write(request.raw_csv_path(), Self::samples(request.run_index))
            .map_err(|e| HarnessError::Configuration(e.to_string()))?;
        Ok(LaunchOutput {
            raw_csv: request.raw_csv_path(),
            stdout: STREAM_STDOUT.to_string(),
            stderr: String::new(),
        })
    }
}

fn batch_config(dir: &TempDir, runs: u32) -> BatchConfig {
    BatchConfig {
        runs,
        start_run: 1,
        node_count: 2,
        output_dir: dir.path().join("stream_run_outputs"),
        aggregate_file: dir.path().join("stream_run_outputs/stream_raw_log.csv"),
        metrics_file: dir.path().join("stream_run_outputs/stream_feature_log.csv"),
        ..Default::default()
    }
}

#[test]
fn test_batch_then_extract_features() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = Orchestrator::new(
        batch_config(&temp_dir, 4),
        PolicyCycle::new(["default", "interleave_all,preferred_node0", "preferred-1"]),
        StreamWorkload::new("/opt/stream-gcc"),
        RecordedLauncher,
    );

    let summary = orchestrator.run_batch().unwrap();
    assert_eq!(summary.runs_completed, 4);
    assert_eq!(summary.samples_appended, 12);
    assert_eq!(summary.warnings, 0);

    let metrics = fs::read_to_string(orchestrator.metrics_file()).unwrap();
    assert_eq!(metrics.lines().count(), 5);
    assert!(metrics
        .lines()
        .nth(2)
        .unwrap()
        .starts_with("2,interleave_all,11538.463700,0.013900000"));

    let output = temp_dir.path().join("features.csv");
    let features = FeatureExtractor::new()
        .extract_file(orchestrator.aggregate_file(), &output)
        .unwrap();

    assert_eq!(features.run_column, "stream_run");
    assert_eq!(features.rows.len(), 4);
    for (i, row) in features.rows.iter().enumerate() {
        assert_eq!(row.run_id, i as u32 + 1);
        assert!((row.trend[0].unwrap() - 0.3).abs() < 1e-9);
        assert!((row.min_usage[0].unwrap() - 0.5).abs() < 1e-9);
        assert!((row.max_usage[0].unwrap() - 0.8).abs() < 1e-9);
        assert_eq!(row.total_page_migrations, 40);
        assert_eq!(row.free_pages_change, [-20, -40]);
        assert!((row.run_timestep - 0.2).abs() < 1e-6);
    }

    let flags: Vec<[u8; 4]> = features
        .rows
        .iter()
        .map(|r| [r.first_touch, r.interleave, r.preferred_0, r.preferred_1])
        .collect();
    assert_eq!(flags, vec![[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0], [0, 0, 0, 1]]);

    let written = fs::read_to_string(&output).unwrap();
    let mut lines = written.lines();
    assert!(lines
        .next()
        .unwrap()
        .starts_with("stream_run,run_timestep,node_0_usage,node_1_usage,node_0_trend"));
    assert_eq!(lines.count(), 4);
}

#[test]
fn test_second_batch_with_same_policies_appends() {
    let temp_dir = TempDir::new().unwrap();
    let first = Orchestrator::new(
        batch_config(&temp_dir, 2),
        PolicyCycle::new(["default"]),
        StreamWorkload::new("/opt/stream-gcc"),
        RecordedLauncher,
    );
    first.run_batch().unwrap();

    let second = Orchestrator::new(
        batch_config(&temp_dir, 2),
        PolicyCycle::new(["default"]),
        StreamWorkload::new("/opt/stream-gcc"),
        RecordedLauncher,
    );
    second.run_batch().unwrap();

    assert_eq!(first.aggregate_file(), second.aggregate_file());
    let content = fs::read_to_string(second.aggregate_file()).unwrap();
    assert_eq!(content.lines().count(), 1 + 12);

    // Same run ids twice: still one feature row per distinct id
    let features = FeatureExtractor::new()
        .extract_path(second.aggregate_file())
        .unwrap();
    assert_eq!(features.rows.len(), 2);
}

#[test]
fn test_different_policy_lists_write_separate_files() {
    let temp_dir = TempDir::new().unwrap();
    let a = Orchestrator::new(
        batch_config(&temp_dir, 1),
        PolicyCycle::new(["default"]),
        StreamWorkload::new("/opt/stream-gcc"),
        RecordedLauncher,
    );
    let b = Orchestrator::new(
        batch_config(&temp_dir, 1),
        PolicyCycle::new(["interleave_all"]),
        StreamWorkload::new("/opt/stream-gcc"),
        RecordedLauncher,
    );
    a.run_batch().unwrap();
    b.run_batch().unwrap();

    assert_ne!(a.aggregate_file(), b.aggregate_file());
    assert!(a.aggregate_file().exists() && b.aggregate_file().exists());
}
