//! Observability infrastructure for the harness
//!
//! Provides:
//! - Prometheus batch metrics (runs, samples, warnings, run duration)
//! - Structured logging of batch lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for run durations (in seconds)
const RUN_DURATION_BUCKETS: &[f64] = &[
    0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<HarnessMetricsInner> = OnceLock::new();

struct HarnessMetricsInner {
    run_duration_seconds: Histogram,
    runs_completed: IntCounterVec,
    samples_appended: IntCounter,
    data_warnings: IntCounterVec,
}

impl HarnessMetricsInner {
    fn new() -> Self {
        Self {
            run_duration_seconds: register_histogram!(
                "numa_harness_run_duration_seconds",
                "Wall-clock time of one monitored workload run",
                RUN_DURATION_BUCKETS.to_vec()
            )
            .expect("Failed to register run_duration_seconds"),

            runs_completed: register_int_counter_vec!(
                "numa_harness_runs_completed_total",
                "Runs that finished and were merged into the datasets",
                &["policy"]
            )
            .expect("Failed to register runs_completed"),

            samples_appended: register_int_counter!(
                "numa_harness_samples_appended_total",
                "Raw monitor samples appended to the aggregate dataset"
            )
            .expect("Failed to register samples_appended"),

            data_warnings: register_int_counter_vec!(
                "numa_harness_data_warnings_total",
                "Non-fatal data problems encountered during the batch",
                &["kind"]
            )
            .expect("Failed to register data_warnings"),
        }
    }
}

/// Lightweight handle to the global metrics; clones share the same metrics
#[derive(Clone)]
pub struct HarnessMetrics {
    _private: (),
}

impl Default for HarnessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(HarnessMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &HarnessMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_run_duration(&self, duration_secs: f64) {
        self.inner().run_duration_seconds.observe(duration_secs);
    }

    pub fn inc_runs_completed(&self, policy: &str) {
        self.inner().runs_completed.with_label_values(&[policy]).inc();
    }

    pub fn add_samples_appended(&self, rows: u64) {
        self.inner().samples_appended.inc_by(rows);
    }

    pub fn inc_data_warning(&self, kind: &str) {
        self.inner().data_warnings.with_label_values(&[kind]).inc();
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Write metrics to a textfile-collector file
    pub fn export(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())
    }
}

/// Structured logger for batch events
#[derive(Clone)]
pub struct StructuredLogger {
    workload: String,
}

impl StructuredLogger {
    pub fn new(workload: impl Into<String>) -> Self {
        Self {
            workload: workload.into(),
        }
    }

    pub fn log_batch_started(&self, node_count: usize, runs: u32, start_run: u32, policies: &[String]) {
        info!(
            event = "batch_started",
            workload = %self.workload,
            numa_nodes = node_count,
            runs = runs,
            start_run = start_run,
            policies = %policies.join(","),
            "Detected {} NUMA nodes, running {} iterations starting at run {}",
            node_count,
            runs,
            start_run
        );
    }

    pub fn log_run_completed(&self, run_index: u32, policy: &str, samples: usize, duration_secs: f64) {
        info!(
            event = "run_completed",
            workload = %self.workload,
            run = run_index,
            policy = %policy,
            samples = samples,
            duration_secs = duration_secs,
            "Run complete"
        );
    }

    pub fn log_batch_finished(&self, runs_completed: u32, aggregate: &Path, metrics: &Path) {
        info!(
            event = "batch_finished",
            workload = %self.workload,
            runs_completed = runs_completed,
            aggregate = %aggregate.display(),
            metrics = %metrics.display(),
            "All runs complete"
        );
    }

    pub fn log_batch_aborted(&self, run_index: u32, error: &dyn std::error::Error) {
        warn!(
            event = "batch_aborted",
            workload = %self.workload,
            run = run_index,
            error = %error,
            "Batch aborted, rows from completed runs remain on disk"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_render_after_updates() {
        let metrics = HarnessMetrics::new();
        metrics.observe_run_duration(1.5);
        metrics.inc_runs_completed("default");
        metrics.add_samples_appended(10);
        metrics.inc_data_warning("empty_run_output");

        let text = metrics.render();
        assert!(text.contains("numa_harness_runs_completed_total"));
        assert!(text.contains("numa_harness_samples_appended_total"));
    }

    #[test]
    fn test_export_writes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("prom").join("harness.prom");
        let metrics = HarnessMetrics::new();
        metrics.inc_runs_completed("interleave_all");

        metrics.export(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("numa_harness"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("stream");
        assert_eq!(logger.workload, "stream");
    }
}
