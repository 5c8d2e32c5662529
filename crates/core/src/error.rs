// crates/core/src/error.rs
use thiserror::Error;

use crate::task::{TaskId, TaskStatus};

/// Errors returned by the task store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(TaskId),

    #[error("task {id} is already {status}")]
    Terminal { id: TaskId, status: TaskStatus },

    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition {
        id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("repository URL for task {id} is already set to {current}")]
    RepoUrlAlreadySet { id: TaskId, current: String },

    #[error("task identifier collision: {0}")]
    IdCollision(TaskId),
}

impl TaskError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TaskError::NotFound(_))
    }
}
