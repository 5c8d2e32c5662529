// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gencode_core::TaskStore;

use crate::generator::Generator;
use crate::hub::NotificationHub;
use crate::session::DEFAULT_HEARTBEAT;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Every task known to this process (memory-resident).
    pub store: Arc<TaskStore>,
    /// Fan-out of task snapshots to open status streams.
    pub hub: NotificationHub,
    /// Background driver that runs submitted jobs.
    pub generator: Generator,
    /// Model key used when a generate request omits one.
    pub default_model: String,
    /// Keepalive interval for status streams.
    pub heartbeat: Duration,
}

impl AppState {
    /// Wire state around an existing store, hub, and generator.
    ///
    /// The generator must share `store` and `hub`, or its updates never reach
    /// the routes.
    pub fn new(
        store: Arc<TaskStore>,
        hub: NotificationHub,
        generator: Generator,
        default_model: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            store,
            hub,
            generator,
            default_model: default_model.into(),
            heartbeat: DEFAULT_HEARTBEAT,
        })
    }

    /// Same as [`AppState::new`] with a custom keepalive interval.
    pub fn with_heartbeat(
        store: Arc<TaskStore>,
        hub: NotificationHub,
        generator: Generator,
        default_model: impl Into<String>,
        heartbeat: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            store,
            hub,
            generator,
            default_model: default_model.into(),
            heartbeat,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
