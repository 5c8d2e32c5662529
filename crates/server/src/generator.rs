// crates/server/src/generator.rs
//! Generation driver: runs one job from `pending` to a terminal status.
//!
//! Every stage goes through the store first and then the hub, so observers
//! only ever see snapshots the store has accepted. Any collaborator error or
//! the job timeout ends the task through `set_error`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gencode_core::llm::{LlmError, ProviderRegistry};
use gencode_core::publish::{write_project_files, PublishError, Publisher};
use gencode_core::{Task, TaskError, TaskId, TaskStatus, TaskStore};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::hub::NotificationHub;

pub const MSG_WAITING: &str = "Waiting for an available worker...";
pub const MSG_GENERATING: &str = "Generating code with LLM...";
pub const MSG_WRITING: &str = "Writing files to disk...";
pub const MSG_CREATING_REPO: &str = "Creating GitHub repository...";
pub const MSG_PUSHING: &str = "Pushing code to GitHub...";
pub const MSG_COMPLETED: &str = "Successfully generated and pushed code!";

/// Why a job failed. The display text is what observers see in `error`.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("no content producer configured for model '{0}'")]
    UnknownModel(String),

    #[error("failed to generate code: {0}")]
    Generate(#[source] LlmError),

    #[error("failed to generate code: the model returned no files")]
    EmptyProject,

    #[error("failed to create temp directory: {0}")]
    TempDir(#[source] std::io::Error),

    #[error("failed to write files: {0}")]
    WriteFiles(#[source] PublishError),

    #[error("failed to create repository: {0}")]
    CreateRepo(#[source] PublishError),

    #[error("failed to push files: {0}")]
    Push(#[source] PublishError),

    #[error("task timed out after {0} seconds")]
    Timeout(u64),

    #[error("worker pool is shut down")]
    PoolClosed,

    /// The store refused a transition; the task is left as the store has it.
    #[error(transparent)]
    Task(#[from] TaskError),
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Parent of the per-task working directories.
    pub temp_dir: PathBuf,
    pub task_timeout: Duration,
    pub max_concurrent: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("./tmp"),
            task_timeout: Duration::from_secs(600),
            max_concurrent: 5,
        }
    }
}

/// Drives generation jobs. Cheap to clone; clones share the worker pool.
#[derive(Clone)]
pub struct Generator {
    store: Arc<TaskStore>,
    hub: NotificationHub,
    providers: ProviderRegistry,
    publisher: Arc<dyn Publisher>,
    config: GeneratorConfig,
    permits: Arc<Semaphore>,
}

impl Generator {
    pub fn new(
        store: Arc<TaskStore>,
        hub: NotificationHub,
        providers: ProviderRegistry,
        publisher: Arc<dyn Publisher>,
        config: GeneratorConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            store,
            hub,
            providers,
            publisher,
            config,
            permits,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn has_model(&self, model: &str) -> bool {
        self.providers.contains(model)
    }

    /// Run the job for `task_id` in the background.
    pub fn spawn(&self, task_id: TaskId) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.process(task_id).await })
    }

    /// Run the job for `task_id` to completion. Never returns an error: the
    /// outcome is recorded on the task.
    pub async fn process(&self, task_id: TaskId) {
        let task = match self.store.get(&task_id) {
            Ok(task) => task,
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Generation skipped");
                return;
            }
        };

        let _permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::info!(task_id = %task_id, "All workers busy, queueing task");
                if let Err(e) = self.advance(&task_id, TaskStatus::Pending, MSG_WAITING) {
                    tracing::warn!(task_id = %task_id, error = %e, "Could not report queued state");
                }
                match Arc::clone(&self.permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::error!(task_id = %task_id, "Worker pool closed before the task started");
                        self.fail(&task_id, &GenerateError::PoolClosed, Duration::ZERO);
                        return;
                    }
                }
            }
        };

        let started = Instant::now();
        tracing::info!(task_id = %task_id, model = %task.model, repo = %task.repo_name, "Generation started");

        let result = match tokio::time::timeout(self.config.task_timeout, self.generate_and_push(&task))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerateError::Timeout(self.config.task_timeout.as_secs())),
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    task_id = %task_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Generation completed"
                );
                crate::metrics::record_task_finished("completed", started.elapsed());
            }
            Err(GenerateError::Task(e)) => {
                tracing::warn!(task_id = %task_id, error = %e, "Task state changed underneath the driver");
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Generation failed");
                self.fail(&task_id, &e, started.elapsed());
            }
        }
    }

    async fn generate_and_push(&self, task: &Task) -> Result<(), GenerateError> {
        let id = &task.task_id;
        let provider = self
            .providers
            .get(&task.model)
            .ok_or_else(|| GenerateError::UnknownModel(task.model.clone()))?;

        self.advance(id, TaskStatus::Generating, MSG_GENERATING)?;
        let project = provider
            .generate_project(&task.prompt)
            .await
            .map_err(GenerateError::Generate)?;
        if project.files.is_empty() {
            return Err(GenerateError::EmptyProject);
        }
        tracing::debug!(task_id = %id, files = project.files.len(), "Project generated");

        let workdir = self.config.temp_dir.join(id.as_str());
        tokio::fs::create_dir_all(&workdir)
            .await
            .map_err(GenerateError::TempDir)?;

        self.advance(id, TaskStatus::MergingFiles, MSG_WRITING)?;
        write_project_files(&workdir, &project.files)
            .await
            .map_err(GenerateError::WriteFiles)?;

        self.advance(id, TaskStatus::CreatingRepo, MSG_CREATING_REPO)?;
        let repo = self
            .publisher
            .create_repository(&task.repo_name, &project.description, task.github_org.as_deref())
            .await
            .map_err(GenerateError::CreateRepo)?;
        self.hub.broadcast(self.store.set_repo_url(id, &repo.html_url)?);

        self.advance(id, TaskStatus::Pushing, MSG_PUSHING)?;
        let commit_message = format!("Initial commit: {}", project.description);
        self.publisher
            .push_directory(&repo.clone_url, &workdir, &commit_message)
            .await
            .map_err(GenerateError::Push)?;

        // Kept on failure for inspection.
        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            tracing::warn!(task_id = %id, path = %workdir.display(), error = %e, "Failed to remove working directory");
        }

        self.advance(id, TaskStatus::Completed, MSG_COMPLETED)?;
        Ok(())
    }

    fn advance(&self, id: &TaskId, status: TaskStatus, message: &str) -> Result<(), TaskError> {
        let snapshot = self.store.update_status(id, status, message)?;
        tracing::debug!(task_id = %id, status = %status, "Task advanced");
        self.hub.broadcast(snapshot);
        Ok(())
    }

    /// Record `err` on the task, notify observers, and count the failure.
    fn fail(&self, id: &TaskId, err: &GenerateError, elapsed: Duration) {
        match self.store.set_error(id, err) {
            Ok(snapshot) => {
                self.hub.broadcast(snapshot);
                crate::metrics::record_task_finished("failed", elapsed);
            }
            Err(e) => tracing::warn!(task_id = %id, error = %e, "Could not record failure"),
        }
    }
}
