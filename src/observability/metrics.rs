//! Metrics collection and exposition.
//!
//! # Metrics
//! - `connector_requests_total` (counter): requests by action, status
//! - `connector_request_duration_seconds` (histogram): dispatch latency by action
//! - `connector_unknown_errors_total` (counter): panics converted to `runtime.unknown`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Record one dispatched request.
pub fn record_request(action: &'static str, status: u16, started: Instant) {
    counter!("connector_requests_total", "action" => action, "status" => status.to_string()).increment(1);
    histogram!("connector_request_duration_seconds", "action" => action).record(started.elapsed().as_secs_f64());
}

pub fn record_unknown_error() {
    counter!("connector_unknown_errors_total").increment(1);
}

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
