// crates/server/src/lib.rs
//! gencode server library.
//!
//! Accepts generation jobs over HTTP, runs them in the background, and
//! streams each task's progress to observers over Server-Sent Events.

pub mod config;
pub mod error;
pub mod generator;
pub mod hub;
pub mod metrics;
pub mod routes;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::*;
pub use generator::{Generator, GeneratorConfig};
pub use hub::NotificationHub;
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use session::{SessionEvent, StatusEvent, StreamingSession};
pub use state::AppState;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, Method};
use axum::Router;
use gencode_core::llm::ProviderRegistry;
use gencode_core::publish::GitHubPublisher;
use gencode_core::TaskStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - Task, status-stream, health and metrics routes
/// - CORS (any origin; GET, POST, OPTIONS; Content-Type)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the production state: store, hub, LLM providers, and the GitHub
/// publisher, all from `config`.
pub fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let providers = ProviderRegistry::from_configs(&config.llm_configs())
        .context("failed to create LLM providers")?;
    tracing::info!(
        models = ?providers.keys().collect::<Vec<_>>(),
        default_model = %config.default_model,
        "LLM providers ready"
    );

    let store = Arc::new(TaskStore::new());
    let hub = NotificationHub::new();
    let generator = Generator::new(
        Arc::clone(&store),
        hub.clone(),
        providers,
        Arc::new(GitHubPublisher::new(config.github())),
        config.generator(),
    );

    Ok(AppState::with_heartbeat(
        store,
        hub,
        generator,
        config.default_model.clone(),
        config.heartbeat(),
    ))
}

// ============================================================================
// Integration Tests
// ============================================================================
