// crates/server/src/routes/mod.rs
//! API route handlers for the gencode server.

pub mod health;
pub mod metrics;
pub mod status;
pub mod tasks;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - POST /api/v1/generate - Submit a generation job
/// - GET  /api/v1/task/{task_id} - Current snapshot of a task
/// - GET  /api/v1/tasks - Tasks that have not finished
/// - GET  /api/v1/status/{task_id} - SSE stream of a task's progress
/// - GET  /health - Liveness and task counts
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", tasks::router())
        .nest("/api/v1", status::router())
        .merge(health::router())
        .merge(metrics::router())
        .with_state(state)
}
