// crates/server/src/testing.rs
//! Stub collaborators and state builders shared by unit tests.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gencode_core::llm::{FileInfo, GeneratedProject, LlmError, LlmProvider, ProviderRegistry};
use gencode_core::publish::{PublishError, Publisher, Repository};
use gencode_core::TaskStore;

use crate::generator::{Generator, GeneratorConfig};
use crate::hub::NotificationHub;
use crate::state::AppState;

pub(crate) fn sample_project() -> GeneratedProject {
    GeneratedProject {
        name: "todo".to_string(),
        description: "A todo app".to_string(),
        files: vec![FileInfo {
            path: "src/main.rs".to_string(),
            content: "fn main() {}\n".to_string(),
            file_type: "rust".to_string(),
        }],
    }
}

/// Content producer returning a canned result once.
pub(crate) struct StubProducer {
    result: Mutex<Option<Result<GeneratedProject, LlmError>>>,
    pub delay: Duration,
}

impl StubProducer {
    pub fn ok() -> Self {
        Self::with(Ok(sample_project()))
    }

    pub fn with(result: Result<GeneratedProject, LlmError>) -> Self {
        Self {
            result: Mutex::new(Some(result)),
            delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl LlmProvider for StubProducer {
    async fn generate_project(&self, _prompt: &str) -> Result<GeneratedProject, LlmError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(LlmError::NotAvailable("exhausted".to_string())))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Publisher that records pushes instead of talking to GitHub.
#[derive(Default)]
pub(crate) struct StubPublisher {
    pub fail_create: bool,
    /// (clone_url, commit_message, project file present at push time)
    pub pushed: Mutex<Vec<(String, String, bool)>>,
}

#[async_trait]
impl Publisher for StubPublisher {
    async fn create_repository(
        &self,
        name: &str,
        _description: &str,
        org: Option<&str>,
    ) -> Result<Repository, PublishError> {
        if self.fail_create {
            return Err(PublishError::Unauthorized);
        }
        let owner = org.unwrap_or("me");
        Ok(Repository {
            html_url: format!("https://github.com/{owner}/{name}"),
            clone_url: format!("https://github.com/{owner}/{name}.git"),
        })
    }

    async fn push_directory(
        &self,
        clone_url: &str,
        dir: &Path,
        commit_message: &str,
    ) -> Result<(), PublishError> {
        let has_file = dir.join("src/main.rs").exists();
        self.pushed.lock().unwrap().push((
            clone_url.to_string(),
            commit_message.to_string(),
            has_file,
        ));
        Ok(())
    }
}

/// Generator wired to stubs, with "deepseek" served by `producer`.
pub(crate) fn stub_generator(
    store: Arc<TaskStore>,
    hub: NotificationHub,
    producer: StubProducer,
    publisher: Arc<StubPublisher>,
    config: GeneratorConfig,
) -> Generator {
    let mut providers = ProviderRegistry::new();
    providers.insert("deepseek", Arc::new(producer));
    Generator::new(store, hub, providers, publisher, config)
}

/// App state whose jobs write under `temp_dir` and never leave the process.
pub(crate) fn test_state(temp_dir: &Path) -> Arc<AppState> {
    let store = Arc::new(TaskStore::new());
    let hub = NotificationHub::new();
    let generator = stub_generator(
        Arc::clone(&store),
        hub.clone(),
        StubProducer::ok(),
        Arc::new(StubPublisher::default()),
        GeneratorConfig {
            temp_dir: temp_dir.to_path_buf(),
            ..GeneratorConfig::default()
        },
    );
    AppState::new(store, hub, generator, "deepseek")
}
