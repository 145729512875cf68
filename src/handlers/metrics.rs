//! Prometheus metrics endpoints
//!
//! GET /metrics renders the registry in text format. POST /record ingests
//! one event pushed by an external process.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::handlers::AppState;
use crate::handlers::extractor::BridgeJson;
use crate::metrics::{MetricsEvent, MetricsSink};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with metrics in Prometheus text format
/// - `500 Internal Server Error` if metrics collection fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:7010/metrics
/// # HELP bridge_requests_total Total number of requests routed by the bridge
/// # TYPE bridge_requests_total counter
/// bridge_requests_total{provider="openai",status="success",task_type="coding"} 42
/// ```
pub async fn handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics().gather() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics for Prometheus scraping");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                format!("Failed to gather metrics: {}", e),
            )
        }
    }
}

/// Record one pushed event; answers `{"recorded": true}`
pub async fn record_handler(
    State(state): State<AppState>,
    BridgeJson(event): BridgeJson<MetricsEvent>,
) -> Json<serde_json::Value> {
    tracing::debug!(event = ?event, "Recording pushed metrics event");
    state.metrics().record(event);
    Json(serde_json::json!({ "recorded": true }))
}
