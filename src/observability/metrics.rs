//! Metrics collection and exposition.
//!
//! # Metrics
//! - `trailhead_requests_total` (counter): requests by method, status
//! - `trailhead_request_duration_seconds` (histogram): latency by method
//! - `trailhead_rate_limited_total` (counter): requests rejected with 429
//! - `trailhead_panics_total` (counter): handler panics turned into 500s
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing unless they call [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "trailhead_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("trailhead_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("trailhead_rate_limited_total").increment(1);
}

pub fn record_panic() {
    counter!("trailhead_panics_total").increment(1);
}
