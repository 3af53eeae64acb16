use metrics::{counter, histogram};
use std::time::Instant;

/// Count one finished ceremony request by ceremony, phase and outcome.
pub fn increment_ceremony(ceremony: &str, phase: &str, outcome: &str) {
    counter!(
        "webauthn_ceremonies_total",
        "ceremony" => ceremony.to_string(),
        "phase" => phase.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Track HTTP request latency using a histogram.
pub fn track_http_request(start: Instant, path: &str, method: &str, status: u16) {
    let elapsed = start.elapsed();
    histogram!(
        "http_request_duration_seconds",
        "path" => path.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .record(elapsed);
}
