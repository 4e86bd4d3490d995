//! Metrics collection and exposition.
//!
//! # Metrics
//! - `governor_requests_total` (counter): requests by outcome (dispatched, rejected)
//! - `governor_rejections_total` (counter): rejections by stage
//! - `governor_rate_limited_total` (counter): rate-limit rejections
//! - `governor_audit_failures_total` (counter): dropped audit lines
//! - `governor_tracked_clients` (gauge): live rate-limit records
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing for it.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and expose it on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatched() {
    counter!("governor_requests_total", "outcome" => "dispatched").increment(1);
}

pub fn record_rejected(stage: &'static str) {
    counter!("governor_requests_total", "outcome" => "rejected").increment(1);
    counter!("governor_rejections_total", "stage" => stage).increment(1);
}

pub fn record_rate_limited() {
    counter!("governor_rate_limited_total").increment(1);
}

pub fn record_audit_failure() {
    counter!("governor_audit_failures_total").increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("governor_tracked_clients").set(count as f64);
}
