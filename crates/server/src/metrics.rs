//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tunecast process:
//! - HTTP request metrics for the status server (latency, counts)
//! - Scheduler state (collected dynamically)
//! - Core push, selection and upstream metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tunecast_core::SchedulerState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tunecast_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunecast_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// 1 while the scheduler loop is running.
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tunecast_scheduler_running",
        "Whether the push scheduler loop is running",
    )
    .unwrap()
});

/// Songs currently in the recommendation history.
pub static HISTORY_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("tunecast_history_size", "Songs in the recommendation history").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(HISTORY_SIZE.clone())).unwrap();

    // Core metrics (dispatch, selection, upstream services)
    for metric in tunecast_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Refresh gauges from current application state before encoding.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    if let Some(scheduler) = state.scheduler() {
        let running = scheduler.status().await.state != SchedulerState::Stopped;
        SCHEDULER_RUNNING.set(i64::from(running));
    }

    // Skip while a push cycle holds the dispatcher.
    if let Ok(dispatcher) = state.dispatcher().try_lock() {
        let status = dispatcher.status().await;
        HISTORY_SIZE.set(status.history_size as i64);
    }
}
