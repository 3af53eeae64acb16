mod counters;
mod prometheus_metrics;
mod recorder;

pub use prometheus_metrics::PrometheusMetrics;
use std::sync::Arc;

// Re-export utilities for internal use within this module
pub(crate) use counters::{increment_ceremony, track_http_request};
pub(crate) use recorder::{init_metrics, render_metrics};

/// Creates a new Prometheus metrics implementation.
///
/// This implementation collects metrics in Prometheus format and exposes
/// them via the `/metrics` endpoint for scraping.
///
/// Returns a fully initialized metrics instance ready for use.
pub fn create() -> anyhow::Result<crate::domain::MetricsPtr> {
    tracing::info!("Initializing Prometheus metrics");
    init_metrics()?;

    Ok(Arc::new(PrometheusMetrics::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_repeatable() {
        assert!(create().is_ok());
        assert!(create().is_ok());
    }

    #[test]
    fn test_ceremony_counter_is_rendered() {
        let metrics = create().unwrap();
        metrics.record_ceremony("attestation", "options", "ok");

        let rendered = metrics.render();
        assert!(rendered.contains("webauthn_ceremonies_total"));
        assert!(rendered.contains("ceremony=\"attestation\""));
    }
}
