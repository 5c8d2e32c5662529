// crates/server/src/routes/metrics.rs
//! Prometheus metrics endpoint.
//!
//! Exposes application metrics in Prometheus text format at `GET /metrics`.

use std::sync::Arc;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::metrics::render_metrics;
use crate::state::AppState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// GET /metrics — task, hub, and stream metrics in Prometheus text format.
///
/// 503 until `init_metrics` has installed the recorder.
pub async fn metrics_handler() -> Response {
    let Some(output) = render_metrics() else {
        tracing::warn!("Metrics scraped before the recorder was installed");
        return (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response();
    };
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], output).into_response()
}

/// Served at the root, outside `/api/v1`, where scrapers expect it.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
