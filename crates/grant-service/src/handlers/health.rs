//! Operational endpoints.

use axum::extract::State;
use metrics_exporter_prometheus::PrometheusHandle;

/// Liveness probe.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
