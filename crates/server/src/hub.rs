// crates/server/src/hub.rs
//! Notification hub: fans task snapshots out to per-task subscribers.
//!
//! A single tokio task owns the subscriber registry and is the only code that
//! touches it. Everything else talks to it by submitting commands over an
//! unbounded channel, so neither registration nor broadcasting ever waits on
//! the loop or on a slow subscriber. A terminal snapshot releases its task's
//! subscribers, so every reader reaches end-of-stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gencode_core::{Task, TaskId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Pending snapshots a subscriber may hold before further ones are dropped.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 10;

pub type SubscriberId = u64;

enum HubCommand {
    Register {
        task_id: TaskId,
        id: SubscriberId,
        tx: mpsc::Sender<Task>,
    },
    Unregister {
        task_id: TaskId,
        id: SubscriberId,
    },
    Broadcast(Task),
    SubscriberCount {
        task_id: TaskId,
        reply: oneshot::Sender<usize>,
    },
    TrackedTasks {
        reply: oneshot::Sender<usize>,
    },
}

struct SubscriberEntry {
    id: SubscriberId,
    tx: mpsc::Sender<Task>,
}

/// Cloneable handle to the hub's control loop.
///
/// The loop runs until every handle (including those held by live
/// [`Subscription`]s) has been dropped.
#[derive(Clone)]
pub struct NotificationHub {
    commands: mpsc::UnboundedSender<HubCommand>,
    next_id: Arc<AtomicU64>,
}

impl NotificationHub {
    /// Spawn the control loop on the current tokio runtime.
    pub fn new() -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self {
            commands,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Subscribe to snapshots of `task_id`.
    ///
    /// Returns immediately; the loop applies the registration asynchronously,
    /// after any command this caller submitted earlier.
    pub fn register(&self, task_id: TaskId) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.submit(HubCommand::Register {
            task_id: task_id.clone(),
            id,
            tx,
        });
        Subscription {
            id,
            task_id,
            rx,
            commands: self.commands.clone(),
            registered: true,
        }
    }

    /// Remove a subscription; its queue is closed once the loop applies this.
    pub fn unregister(&self, subscription: &mut Subscription) {
        subscription.unregister();
    }

    /// Deliver `task` to every subscriber of `task.task_id` without waiting.
    pub fn broadcast(&self, task: Task) {
        self.submit(HubCommand::Broadcast(task));
    }

    /// Number of subscribers currently registered for `task_id`.
    pub async fn subscriber_count(&self, task_id: &TaskId) -> usize {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::SubscriberCount {
            task_id: task_id.clone(),
            reply,
        });
        rx.await.unwrap_or(0)
    }

    /// Number of tasks with at least one subscriber.
    pub async fn tracked_tasks(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        self.submit(HubCommand::TrackedTasks { reply });
        rx.await.unwrap_or(0)
    }

    fn submit(&self, command: HubCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Notification hub loop is gone, command dropped");
        }
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's handle: a bounded queue of snapshots for a single task.
///
/// Dropping the handle unregisters it.
pub struct Subscription {
    id: SubscriberId,
    task_id: TaskId,
    rx: mpsc::Receiver<Task>,
    commands: mpsc::UnboundedSender<HubCommand>,
    registered: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Next snapshot, or `None` once the hub has closed this queue.
    pub async fn recv(&mut self) -> Option<Task> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Task> {
        self.rx.try_recv().ok()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Ask the hub to drop this subscriber. Only the first call has an effect.
    pub fn unregister(&mut self) {
        if !std::mem::take(&mut self.registered) {
            return;
        }
        // A closed loop has no registry left to clean up.
        let _ = self.commands.send(HubCommand::Unregister {
            task_id: self.task_id.clone(),
            id: self.id,
        });
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

async fn run(mut commands: mpsc::UnboundedReceiver<HubCommand>) {
    let mut registry: HashMap<TaskId, Vec<SubscriberEntry>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Register { task_id, id, tx } => {
                tracing::debug!(task_id = %task_id, subscriber_id = id, "Subscriber registered");
                registry
                    .entry(task_id)
                    .or_default()
                    .push(SubscriberEntry { id, tx });
            }
            HubCommand::Unregister { task_id, id } => {
                // Removing the entry drops its sender, which closes the queue.
                remove_subscriber(&mut registry, &task_id, id);
            }
            HubCommand::Broadcast(task) => broadcast(&mut registry, task),
            HubCommand::SubscriberCount { task_id, reply } => {
                let _ = reply.send(registry.get(&task_id).map_or(0, Vec::len));
            }
            HubCommand::TrackedTasks { reply } => {
                let _ = reply.send(registry.len());
            }
        }
    }

    tracing::debug!("Notification hub stopped");
}

fn remove_subscriber(
    registry: &mut HashMap<TaskId, Vec<SubscriberEntry>>,
    task_id: &TaskId,
    id: SubscriberId,
) {
    let Some(subscribers) = registry.get_mut(task_id) else {
        return;
    };
    subscribers.retain(|s| s.id != id);
    if subscribers.is_empty() {
        registry.remove(task_id);
    }
    tracing::debug!(task_id = %task_id, subscriber_id = id, "Subscriber unregistered");
}

fn broadcast(registry: &mut HashMap<TaskId, Vec<SubscriberEntry>>, task: Task) {
    let Some(subscribers) = registry.get_mut(&task.task_id) else {
        return;
    };

    subscribers.retain(|subscriber| match subscriber.tx.try_send(task.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!(
                task_id = %task.task_id,
                subscriber_id = subscriber.id,
                status = %task.status,
                "Subscriber queue full, snapshot dropped"
            );
            crate::metrics::record_dropped_snapshot();
            true
        }
        // Reader is gone; prune it rather than wait for its unregister.
        Err(TrySendError::Closed(_)) => false,
    });

    // Nothing follows a terminal snapshot. Dropping the senders ends every
    // queue, so a reader that missed the terminal snapshot still sees
    // end-of-stream once it has drained what is buffered.
    if subscribers.is_empty() || task.is_terminal() {
        registry.remove(&task.task_id);
    }
}
