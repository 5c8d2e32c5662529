// crates/server/src/session.rs
//! Streaming session: one observer's live view of a task.
//!
//! `Connecting -> Streaming -> Closed`. A session emits the task's current
//! snapshot first, then every newer snapshot the hub delivers, with heartbeats
//! filling idle periods. It closes on a terminal snapshot, on disconnect, or
//! when the hub closes its queue, and always unregisters from the hub on the
//! way out.

use std::time::Duration;

use futures_util::Stream;
use gencode_core::{Task, TaskError, TaskId, TaskStatus, TaskStore};
use serde::Serialize;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::hub::{NotificationHub, Subscription};

/// Keepalive interval used when none is configured.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Streaming,
    Closed,
}

/// Observer-facing payload of one task snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub status: TaskStatus,
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl StatusEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

impl From<&Task> for StatusEvent {
    fn from(task: &Task) -> Self {
        Self {
            status: task.status,
            message: task.message.clone(),
            repo_url: task.repo_url.clone(),
            error: task.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Status(StatusEvent),
    /// Keepalive; carries no task state.
    Heartbeat,
}

pub struct StreamingSession {
    task_id: TaskId,
    state: SessionState,
    subscription: Option<Subscription>,
    initial: Option<Task>,
    last_revision: u64,
    heartbeat: Interval,
    disconnect: CancellationToken,
}

impl StreamingSession {
    /// Open a session for `task_id`.
    ///
    /// Fails with [`TaskError::NotFound`] for an unknown task, before anything
    /// is registered. Must be called from within a tokio runtime.
    pub fn connect(
        store: &TaskStore,
        hub: &NotificationHub,
        task_id: &TaskId,
        heartbeat_every: Duration,
        disconnect: CancellationToken,
    ) -> Result<Self, TaskError> {
        store.get(task_id)?;
        let subscription = hub.register(task_id.clone());
        // Re-read after registering: any mutation after this read is delivered
        // through the subscription, and older ones are skipped by revision.
        let initial = store.get(task_id)?;

        let mut heartbeat =
            tokio::time::interval_at(Instant::now() + heartbeat_every, heartbeat_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            task_id = %task_id,
            subscriber_id = subscription.id(),
            status = %initial.status,
            "Status stream connected"
        );
        crate::metrics::record_session_opened();

        Ok(Self {
            task_id: task_id.clone(),
            state: SessionState::Connecting,
            subscription: Some(subscription),
            initial: Some(initial),
            last_revision: 0,
            heartbeat,
            disconnect,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Wait for the next event; `None` once the session is closed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            match self.state {
                SessionState::Closed => return None,
                SessionState::Connecting => {
                    self.state = SessionState::Streaming;
                    let Some(initial) = self.initial.take() else {
                        self.close("no initial snapshot");
                        return None;
                    };
                    return Some(self.emit(initial));
                }
                SessionState::Streaming => {
                    let Some(subscription) = self.subscription.as_mut() else {
                        self.close("subscription released");
                        return None;
                    };
                    tokio::select! {
                        biased;
                        _ = self.disconnect.cancelled() => {
                            self.close("observer disconnected");
                            return None;
                        }
                        snapshot = subscription.recv() => match snapshot {
                            Some(task) if task.revision <= self.last_revision => continue,
                            Some(task) => return Some(self.emit(task)),
                            None => {
                                self.close("hub closed the queue");
                                return None;
                            }
                        },
                        _ = self.heartbeat.tick() => return Some(SessionEvent::Heartbeat),
                    }
                }
            }
        }
    }

    /// Adapt the session into a stream of events that ends when it closes.
    pub fn into_stream(mut self) -> impl Stream<Item = SessionEvent> + Send {
        async_stream::stream! {
            while let Some(event) = self.next_event().await {
                yield event;
            }
        }
    }

    fn emit(&mut self, task: Task) -> SessionEvent {
        self.last_revision = task.revision;
        let event = StatusEvent::from(&task);
        if event.is_terminal() {
            self.close("task reached a terminal status");
        }
        SessionEvent::Status(event)
    }

    fn close(&mut self, reason: &'static str) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unregister();
        }
        tracing::info!(task_id = %self.task_id, reason, "Status stream closed");
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        // Dropping the subscription (if still held) unregisters it.
        if self.state != SessionState::Closed {
            tracing::info!(task_id = %self.task_id, "Status stream dropped by transport");
        }
        crate::metrics::record_session_closed();
    }
}
