//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_pipeline_stages_total` (counter): stage dispatches by stage, outcome
//! - `edge_invoke_duration_seconds` (histogram): invocation latency by function

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::routing::EventType;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "failed to start metrics exporter"),
    }
}

/// Record one stage dispatch outcome.
pub fn record_stage(stage: EventType, outcome: &'static str) {
    metrics::counter!(
        "edge_pipeline_stages_total",
        "stage" => stage.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one invocation's wall time.
pub fn record_invoke(function: &str, elapsed: Duration) {
    metrics::histogram!(
        "edge_invoke_duration_seconds",
        "function" => function.to_string()
    )
    .record(elapsed.as_secs_f64());
}
