// crates/server/src/main.rs
//! gencode server binary.
//!
//! Loads configuration, wires the store, hub and generation driver, and
//! serves the HTTP API until Ctrl-C.

use anyhow::Result;
use gencode_server::{build_state, create_app, init_metrics, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "warn,gencode_server=info,gencode_core=info";

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().compact())
        .init();

    let config = Config::load()?;
    init_metrics();

    let state = build_state(&config)?;
    let app = create_app(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        max_concurrent_tasks = config.max_concurrent_tasks,
        temp_dir = %config.temp_dir.display(),
        "gencode listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
