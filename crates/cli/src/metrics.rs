//! Prometheus registry for the command-line run.

use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Registry holding every pipeline metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in collage_core::metrics::all_metrics() {
        // Each collector is a distinct static, so registration cannot collide.
        let _ = registry.register(metric);
    }
    registry
});

/// Encode all metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_pipeline_metrics() {
        collage_core::metrics::CELLS_PLACED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("collage_cells_placed_total"));
    }
}
