// crates/core/src/task.rs
//! Task entity and its status state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque unique identifier for a task (UUID v4 string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Allocate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a generation task, declared in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Generating,
    MergingFiles,
    CreatingRepo,
    Pushing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Wire name, as used in JSON and SSE payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Generating => "generating",
            TaskStatus::MergingFiles => "merging_files",
            TaskStatus::CreatingRepo => "creating_repo",
            TaskStatus::Pushing => "pushing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// `Completed` and `Failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Position along the pipeline. `Failed` ranks with `Completed`: both end it.
    pub(crate) fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Generating => 1,
            TaskStatus::MergingFiles => 2,
            TaskStatus::CreatingRepo => 3,
            TaskStatus::Pushing => 4,
            TaskStatus::Completed | TaskStatus::Failed => 5,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The job-defining fields supplied on submission. Immutable once a task exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub prompt: String,
    pub repo_name: String,
    /// Key of the content producer selected for this job ("deepseek", "openai").
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org: Option<String>,
}

/// Snapshot of one generation job.
///
/// Instances handed out by the store are copies; mutating one has no effect on
/// the stored task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub prompt: String,
    pub repo_name: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org: Option<String>,
    pub status: TaskStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Incremented on every mutation; orders snapshots of the same task.
    pub revision: u64,
}

impl Task {
    pub(crate) fn new(task_id: TaskId, spec: JobSpec) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            prompt: spec.prompt,
            repo_name: spec.repo_name,
            model: spec.model,
            github_org: spec.github_org,
            status: TaskStatus::Pending,
            message: "Task created".to_string(),
            repo_url: String::new(),
            error: String::new(),
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn job_spec(&self) -> JobSpec {
        JobSpec {
            prompt: self.prompt.clone(),
            repo_name: self.repo_name.clone(),
            model: self.model.clone(),
            github_org: self.github_org.clone(),
        }
    }

    pub(crate) fn touch(&mut self) {
        // Utc::now() is not guaranteed monotonic; never let updated_at go backwards.
        self.updated_at = Utc::now().max(self.updated_at);
        self.revision += 1;
    }
}
