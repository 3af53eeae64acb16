//! Prometheus metrics implementation.
//!
//! Concrete implementation of the `Metrics` trait on top of the global
//! `metrics` crate registry. Counters and histograms are registered on first
//! use; the handle kept in `recorder.rs` renders them in Prometheus text format.

use crate::domain::Metrics;
use std::time::Instant;

/// Prometheus-based metrics implementation.
///
/// Stateless: every metric lives in the global registry.
#[derive(Default)]
pub struct PrometheusMetrics;

impl PrometheusMetrics {
    pub fn new() -> Self {
        tracing::info!("Creating Prometheus metrics");
        PrometheusMetrics
    }
}

impl Metrics for PrometheusMetrics {
    fn render(&self) -> String {
        super::render_metrics()
    }

    fn record_ceremony(&self, ceremony: &str, phase: &str, outcome: &str) {
        tracing::debug!(ceremony, phase, outcome, "Recording ceremony outcome");
        super::increment_ceremony(ceremony, phase, outcome);
    }

    fn record_http_request(&self, start: Instant, path: &str, method: &str, status: u16) {
        super::track_http_request(start, path, method, status);
    }
}
