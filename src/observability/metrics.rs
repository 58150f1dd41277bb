//! Metrics collection and exposition.
//!
//! # Metrics
//! - `endpoint_health` (gauge): 1=healthy, 0=unhealthy, by hostname and address
//! - `health_probe_duration_seconds` (histogram): probe latency
//! - `health_probes_total` (counter): probes by hostname and outcome
//! - `connector_requests_total` (counter): requests by mode and outcome
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::health::HealthState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one health probe.
pub fn record_probe(hostname: &str, address: IpAddr, state: HealthState, elapsed: Duration) {
    let address = address.to_string();
    let outcome = if state.is_healthy() { "healthy" } else { "unhealthy" };

    gauge!("endpoint_health", "hostname" => hostname.to_string(), "address" => address.clone())
        .set(if state.is_healthy() { 1.0 } else { 0.0 });
    histogram!("health_probe_duration_seconds", "hostname" => hostname.to_string(), "address" => address)
        .record(elapsed.as_secs_f64());
    counter!("health_probes_total", "hostname" => hostname.to_string(), "outcome" => outcome)
        .increment(1);
}

/// Record one connector request.
pub fn record_request(mode: &'static str, outcome: &'static str) {
    counter!("connector_requests_total", "mode" => mode, "outcome" => outcome).increment(1);
}
