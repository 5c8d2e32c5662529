// crates/core/src/store.rs
//! In-memory task store: the single source of truth for task state.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::TaskError;
use crate::task::{JobSpec, Task, TaskId, TaskStatus};

/// Concurrency-safe keyed collection of tasks.
///
/// Reads take the shared lock, writes the exclusive lock. Every method holds
/// the lock only for the in-memory copy or mutation and returns an owned
/// snapshot, so callers can forward it (e.g. to the notification hub) without
/// touching the store again. The store has no knowledge of subscribers.
///
/// Uses `std::sync::RwLock` (not `tokio::sync::RwLock`): no method awaits
/// while holding it.
pub struct TaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Create a pending task for `spec` under a freshly allocated identifier.
    pub fn create(&self, spec: JobSpec) -> Result<Task, TaskError> {
        self.insert(Task::new(TaskId::generate(), spec))
    }

    fn insert(&self, task: Task) -> Result<Task, TaskError> {
        let mut tasks = self.write();
        match tasks.entry(task.task_id.clone()) {
            Entry::Occupied(_) => {
                tracing::error!(task_id = %task.task_id, "Task identifier collision");
                Err(TaskError::IdCollision(task.task_id))
            }
            Entry::Vacant(slot) => Ok(slot.insert(task).clone()),
        }
    }

    /// Current snapshot of a task.
    pub fn get(&self, id: &TaskId) -> Result<Task, TaskError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    /// Move a task to `status` with a new progress message.
    ///
    /// Statuses only move forward along the pipeline; repeating the current
    /// status with a new message is allowed. `Failed` is reachable only through
    /// [`TaskStore::set_error`] so that a failed task always carries an error.
    pub fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
        message: impl Into<String>,
    ) -> Result<Task, TaskError> {
        self.mutate(id, |task| {
            if status == TaskStatus::Failed || status.rank() < task.status.rank() {
                return Err(TaskError::InvalidTransition {
                    id: task.task_id.clone(),
                    from: task.status,
                    to: status,
                });
            }
            task.status = status;
            task.message = message.into();
            Ok(())
        })
    }

    /// Fail a task, recording `err`'s description.
    pub fn set_error(&self, id: &TaskId, err: impl Display) -> Result<Task, TaskError> {
        self.mutate(id, |task| {
            task.status = TaskStatus::Failed;
            task.error = err.to_string();
            task.message = "Task failed".to_string();
            Ok(())
        })
    }

    /// Record the published repository URL.
    ///
    /// Setting the same URL again is a no-op success; a different URL is
    /// rejected and the original is kept.
    pub fn set_repo_url(&self, id: &TaskId, url: impl Into<String>) -> Result<Task, TaskError> {
        let url = url.into();
        self.mutate(id, |task| {
            if !task.repo_url.is_empty() && task.repo_url != url {
                return Err(TaskError::RepoUrlAlreadySet {
                    id: task.task_id.clone(),
                    current: task.repo_url.clone(),
                });
            }
            task.repo_url = url;
            Ok(())
        })
    }

    /// All tasks that have not reached a terminal status, newest first.
    pub fn active(&self) -> Vec<Task> {
        let mut active: Vec<Task> = self
            .read()
            .values()
            .filter(|t| !t.is_terminal())
            .cloned()
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        active
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` under the write lock. Terminal tasks are immutable; when `f`
    /// fails the stored task is left untouched.
    fn mutate<F>(&self, id: &TaskId, f: F) -> Result<Task, TaskError>
    where
        F: FnOnce(&mut Task) -> Result<(), TaskError>,
    {
        let mut tasks = self.write();
        let stored = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;
        if stored.is_terminal() {
            return Err(TaskError::Terminal {
                id: id.clone(),
                status: stored.status,
            });
        }

        let mut next = stored.clone();
        f(&mut next)?;
        next.touch();
        *stored = next.clone();
        Ok(next)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TaskId, Task>> {
        self.tasks.read().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned reading tasks map: {e}");
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TaskId, Task>> {
        self.tasks.write().unwrap_or_else(|e| {
            tracing::error!("RwLock poisoned writing tasks map: {e}");
            e.into_inner()
        })
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn spec(prompt: &str, name: &str) -> JobSpec {
        JobSpec {
            prompt: prompt.to_string(),
            repo_name: name.to_string(),
            model: "deepseek".to_string(),
            github_org: None,
        }
    }

    #[test]
    fn test_create_returns_pending_snapshot() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.message, "Task created");
        assert_eq!(task.repo_url, "");
        assert_eq!(task.error, "");
        assert_eq!(store.get(&task.task_id).unwrap(), task);
    }

    #[test]
    fn test_get_returns_submitted_job_fields() {
        let store = TaskStore::new();
        let submitted = JobSpec {
            prompt: "build a todo app".to_string(),
            repo_name: "todo".to_string(),
            model: "openai".to_string(),
            github_org: Some("acme".to_string()),
        };
        let task = store.create(submitted.clone()).unwrap();
        assert_eq!(store.get(&task.task_id).unwrap().job_spec(), submitted);
    }

    #[test]
    fn test_concurrent_creates_have_distinct_ids() {
        let store = Arc::new(TaskStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|j| {
                            let name = format!("repo-{i}-{j}");
                            let task = store.create(spec("p", &name)).unwrap();
                            assert_eq!(store.get(&task.task_id).unwrap().repo_name, name);
                            task.task_id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<TaskId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(ids.len(), 400);
        assert_eq!(store.len(), 400);
    }

    #[test]
    fn test_update_status_advances_updated_at() {
        let store = TaskStore::new();
        let created = store.create(spec("x", "y")).unwrap();

        let updated = store
            .update_status(&created.task_id, TaskStatus::Generating, "Generating code...")
            .unwrap();
        assert_eq!(updated.status, TaskStatus::Generating);
        assert_eq!(updated.message, "Generating code...");
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.revision, created.revision + 1);
        assert_eq!(store.get(&created.task_id).unwrap(), updated);
    }

    #[test]
    fn test_unknown_id_fails_without_mutation() {
        let store = TaskStore::new();
        let existing = store.create(spec("x", "y")).unwrap();
        let unknown = TaskId::from("does-not-exist");

        assert_eq!(
            store.update_status(&unknown, TaskStatus::Generating, "m"),
            Err(TaskError::NotFound(unknown.clone()))
        );
        assert_eq!(
            store.set_error(&unknown, "boom"),
            Err(TaskError::NotFound(unknown.clone()))
        );
        assert_eq!(
            store.set_repo_url(&unknown, "https://example/repo"),
            Err(TaskError::NotFound(unknown.clone()))
        );
        assert!(store.get(&unknown).unwrap_err().is_not_found());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&existing.task_id).unwrap(), existing);
    }

    #[test]
    fn test_set_error_fails_task() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        store
            .update_status(&task.task_id, TaskStatus::Generating, "Generating code...")
            .unwrap();

        store.set_error(&task.task_id, "boom").unwrap();

        let failed = store.get(&task.task_id).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert_eq!(failed.error, "boom");
        assert_eq!(failed.message, "Task failed");
    }

    #[test]
    fn test_set_error_uses_error_description() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let failed = store.set_error(&task.task_id, io).unwrap();
        assert_eq!(failed.error, "disk full");
    }

    #[test]
    fn test_terminal_task_is_immutable() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        let failed = store.set_error(&task.task_id, "boom").unwrap();

        let err = store
            .update_status(&task.task_id, TaskStatus::Completed, "done")
            .unwrap_err();
        assert!(matches!(err, TaskError::Terminal { status: TaskStatus::Failed, .. }));
        assert!(store.set_error(&task.task_id, "again").is_err());
        assert!(store.set_repo_url(&task.task_id, "https://example/repo").is_err());
        assert_eq!(store.get(&task.task_id).unwrap(), failed);
    }

    #[test]
    fn test_backward_transition_rejected() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        let pushing = store
            .update_status(&task.task_id, TaskStatus::Pushing, "Pushing code...")
            .unwrap();

        let err = store
            .update_status(&task.task_id, TaskStatus::Generating, "again")
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidTransition {
                from: TaskStatus::Pushing,
                to: TaskStatus::Generating,
                ..
            }
        ));
        assert_eq!(store.get(&task.task_id).unwrap(), pushing);
    }

    #[test]
    fn test_same_status_new_message_allowed() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        store
            .update_status(&task.task_id, TaskStatus::Generating, "step 1")
            .unwrap();
        let again = store
            .update_status(&task.task_id, TaskStatus::Generating, "step 2")
            .unwrap();
        assert_eq!(again.message, "step 2");
    }

    #[test]
    fn test_failed_only_via_set_error() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        assert!(store
            .update_status(&task.task_id, TaskStatus::Failed, "nope")
            .is_err());
        let stored = store.get(&task.task_id).unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert!(stored.error.is_empty());
    }

    #[test]
    fn test_set_repo_url_once() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();

        let set = store
            .set_repo_url(&task.task_id, "https://example/repo")
            .unwrap();
        assert_eq!(set.repo_url, "https://example/repo");
        assert_eq!(store.get(&task.task_id).unwrap().repo_url, "https://example/repo");

        // Same URL again is idempotent.
        assert!(store.set_repo_url(&task.task_id, "https://example/repo").is_ok());

        let err = store
            .set_repo_url(&task.task_id, "https://example/other")
            .unwrap_err();
        assert!(matches!(err, TaskError::RepoUrlAlreadySet { .. }));
        assert_eq!(store.get(&task.task_id).unwrap().repo_url, "https://example/repo");
    }

    #[test]
    fn test_repo_url_survives_later_updates() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        store.set_repo_url(&task.task_id, "https://example/repo").unwrap();
        store
            .update_status(&task.task_id, TaskStatus::Pushing, "Pushing code...")
            .unwrap();
        store.set_error(&task.task_id, "push rejected").unwrap();
        assert_eq!(store.get(&task.task_id).unwrap().repo_url, "https://example/repo");
    }

    #[test]
    fn test_insert_collision_is_an_error() {
        let store = TaskStore::new();
        let task = store.create(spec("x", "y")).unwrap();
        let dup = Task::new(task.task_id.clone(), spec("other", "z"));
        assert_eq!(
            store.insert(dup),
            Err(TaskError::IdCollision(task.task_id.clone()))
        );
        assert_eq!(store.get(&task.task_id).unwrap().prompt, "x");
    }

    #[test]
    fn test_active_excludes_terminal() {
        let store = TaskStore::new();
        let a = store.create(spec("a", "a")).unwrap();
        let b = store.create(spec("b", "b")).unwrap();
        store.set_error(&a.task_id, "boom").unwrap();

        let active = store.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].task_id, b.task_id);
        assert!(!store.is_empty());
    }
}
