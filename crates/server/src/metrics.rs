//! Application metrics for Prometheus monitoring.
//!
//! This module provides:
//! - Prometheus metrics recorder initialization
//! - Metric definitions (counters, histograms, gauges)
//! - Helper functions for recording task, hub, and stream metrics

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// This should be called once at application startup, before any metrics are recorded.
/// Returns `true` if initialization succeeded, `false` if already initialized.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }

    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();

    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!("tasks_created_total", "Total number of generation tasks submitted");
    describe_counter!(
        "tasks_finished_total",
        "Total number of generation tasks that reached a terminal status, by outcome"
    );
    describe_histogram!(
        "task_duration_seconds",
        "Wall-clock duration of generation tasks in seconds"
    );
    describe_counter!(
        "hub_dropped_snapshots_total",
        "Snapshots dropped because a subscriber queue was full"
    );
    describe_gauge!("sse_sessions_active", "Number of open status streams");
}

/// Render current metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

pub fn record_task_created() {
    counter!("tasks_created_total").increment(1);
}

/// Record a task reaching a terminal status.
///
/// # Arguments
/// * `outcome` - "completed" or "failed"
/// * `duration` - time from the driver picking the task up to the terminal status
pub fn record_task_finished(outcome: &'static str, duration: Duration) {
    counter!("tasks_finished_total", "outcome" => outcome).increment(1);
    histogram!("task_duration_seconds", "outcome" => outcome).record(duration.as_secs_f64());
}

pub fn record_dropped_snapshot() {
    counter!("hub_dropped_snapshots_total").increment(1);
}

pub fn record_session_opened() {
    gauge!("sse_sessions_active").increment(1.0);
}

pub fn record_session_closed() {
    gauge!("sse_sessions_active").decrement(1.0);
}
