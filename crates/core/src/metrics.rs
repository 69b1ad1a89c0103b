//! Prometheus metrics for the collage pipeline.
//!
//! This module provides metrics for:
//! - Photo service calls (search, sizes, fetch)
//! - Stage throughput (resolutions, downloads, placements, decode skips)
//! - Stage durations

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Photo service
// =============================================================================

/// Photo service request duration.
pub static SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "collage_service_duration_seconds",
            "Duration of photo service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"], // "search", "sizes", "fetch"
    )
    .unwrap()
});

/// Photo service requests total.
pub static SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "collage_service_requests_total",
            "Total photo service requests",
        ),
        &["operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Stages
// =============================================================================

/// Search results by visibility.
pub static SEARCH_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("collage_search_results_total", "Search results received"),
        &["visibility"], // "public", "private"
    )
    .unwrap()
});

/// Metadata resolutions by result.
pub static RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("collage_resolutions_total", "Metadata resolutions"),
        &["result"], // "resolved", "failed"
    )
    .unwrap()
});

/// Downloads by result.
pub static DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("collage_downloads_total", "Content downloads"),
        &["result"], // "completed", "failed"
    )
    .unwrap()
});

/// Bytes downloaded.
pub static DOWNLOADED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("collage_downloaded_bytes_total", "Total bytes downloaded").unwrap()
});

/// Cells placed into the grid.
pub static CELLS_PLACED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("collage_cells_placed_total", "Images placed into grid cells").unwrap()
});

/// Payloads dropped because they could not be decoded.
pub static DECODE_SKIPS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "collage_decode_skips_total",
        "Payloads skipped because they could not be decoded",
    )
    .unwrap()
});

/// Stage wall-clock duration.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("collage_stage_duration_seconds", "Duration of pipeline stages")
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["stage"], // "search", "download", "assembly"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Photo service
        Box::new(SERVICE_DURATION.clone()),
        Box::new(SERVICE_REQUESTS.clone()),
        // Stages
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(RESOLUTIONS.clone()),
        Box::new(DOWNLOADS.clone()),
        Box::new(DOWNLOADED_BYTES.clone()),
        Box::new(CELLS_PLACED.clone()),
        Box::new(DECODE_SKIPS.clone()),
        Box::new(STAGE_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        RESOLUTIONS.with_label_values(&["resolved"]).inc();
        assert!(!registry.gather().is_empty());
    }
}
