//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_requests_total` (counter): requests by method, status
//! - `gate_request_duration_seconds` (histogram): latency distribution
//! - `gate_denials_total` (counter): denials by stage
//! - `request_log_failures_total` (counter): request log lines that were lost
//! - `message_edits_total` (counter): edit history events recorded
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Requires a running tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gate_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gate_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_denial(stage: &'static str) {
    metrics::counter!("gate_denials_total", "stage" => stage).increment(1);
}

pub fn record_log_failure() {
    metrics::counter!("request_log_failures_total").increment(1);
}

pub fn record_edit() {
    metrics::counter!("message_edits_total").increment(1);
}
