//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Push cycles (deliveries by result, cycle duration)
//! - Selection outcomes per policy
//! - Upstream services (catalog group failures, weather fetch attempts)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Dispatch
// =============================================================================

/// Per-destination push results.
pub static PUSHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunecast_pushes_total", "Total per-destination push attempts"),
        &["result"], // "sent", "send_failed", "exhausted", "no_candidates", "failed"
    )
    .unwrap()
});

/// Duration of a full push cycle across all destinations.
pub static CYCLE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tunecast_cycle_duration_seconds",
            "Duration of a push cycle",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["slot"],
    )
    .unwrap()
});

/// Catalog refreshes by trigger.
pub static CATALOG_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunecast_catalog_refreshes_total",
            "Catalog refreshes across all destinations",
        ),
        &["trigger"], // "daily", "manual"
    )
    .unwrap()
});

// =============================================================================
// Selection
// =============================================================================

/// Selection outcomes by policy.
pub static SELECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tunecast_selections_total", "Total selection attempts"),
        &["policy", "outcome"], // outcome: "selected", "exhausted", "no_candidates"
    )
    .unwrap()
});

// =============================================================================
// Upstream services
// =============================================================================

/// Playlists skipped during a catalog refresh because the upstream failed.
pub static CATALOG_GROUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tunecast_catalog_group_failures_total",
        "Playlists omitted from a refresh due to upstream errors",
    )
    .unwrap()
});

/// Weather fetch attempts by result.
pub static WEATHER_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tunecast_weather_fetches_total",
            "Weather fetch attempts",
        ),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PUSHES.clone()),
        Box::new(CYCLE_DURATION.clone()),
        Box::new(CATALOG_REFRESHES.clone()),
        Box::new(SELECTIONS.clone()),
        Box::new(CATALOG_GROUP_FAILURES.clone()),
        Box::new(WEATHER_FETCHES.clone()),
    ]
}
