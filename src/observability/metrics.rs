//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (sessions, failures, bytes, duration)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `ws_connections_total` (counter): upgrade requests accepted for relaying
//! - `ws_failures_total` (counter): failures by `stage` (target, dial, hijack, handshake, relay)
//! - `ws_relay_bytes_total` (counter): bytes copied by the first direction to finish
//! - `ws_session_duration_seconds` (histogram): hijack to teardown
//!
//! # Design Decisions
//! - Recording before `init_metrics` is a no-op, so tests need no setup
//! - Labels are static strings only

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection() {
    metrics::counter!("ws_connections_total").increment(1);
}

pub fn record_failure(stage: &'static str) {
    metrics::counter!("ws_failures_total", "stage" => stage).increment(1);
}

pub fn record_relay_bytes(direction: &'static str, bytes: u64) {
    metrics::counter!("ws_relay_bytes_total", "direction" => direction).increment(bytes);
}

pub fn record_session_duration(duration: Duration) {
    metrics::histogram!("ws_session_duration_seconds").record(duration.as_secs_f64());
}
