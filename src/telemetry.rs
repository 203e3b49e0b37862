//! Prometheus telemetry for task executions.
//!
//! The consuming server exposes these through its own metrics endpoint;
//! this module only owns the registry and the recording helpers.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all Mercato orchestrator metrics
const PREFIX: &str = "mercato";

lazy_static! {
    // Registry scoped to the orchestrator's metrics
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref TASK_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_task_runs_total"), "Completed task invocations by outcome"),
        &["task", "status"]
    ).expect("Failed to create task_runs_total metric");

    pub static ref TASK_RUN_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_task_run_duration_seconds"),
            "Task invocation duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 600.0]),
        &["task"]
    ).expect("Failed to create task_run_duration_seconds metric");

    pub static ref TASK_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_task_running"), "Whether a task invocation is in flight"),
        &["task"]
    ).expect("Failed to create task_running metric");
}

/// Register all metrics with the registry
pub fn init_telemetry() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(TASK_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(TASK_RUN_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(TASK_RUNNING.clone()));

    tracing::info!("Telemetry initialized");
}

/// Record a finished task invocation
pub fn record_task_run(task: &str, status: &str, duration: Duration) {
    TASK_RUNS_TOTAL.with_label_values(&[task, status]).inc();

    TASK_RUN_DURATION_SECONDS
        .with_label_values(&[task])
        .observe(duration.as_secs_f64());
}

/// Flag a task invocation as in flight / finished
pub fn set_task_running(task: &str, running: bool) {
    TASK_RUNNING
        .with_label_values(&[task])
        .set(if running { 1.0 } else { 0.0 });
}

/// Encode the registry in the Prometheus text format.
///
/// Encoding problems are logged and yield an empty string; telemetry must
/// never fail its callers.
pub fn encode_text() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to encode telemetry: {}", e);
            String::new()
        }
    }
}
