// crates/core/src/publish/mod.rs
//! Publishing generated projects to a remote version-control host.

pub mod files;
pub mod github;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use files::write_project_files;
pub use github::{GitHubConfig, GitHubPublisher};

/// A repository created on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct Repository {
    /// Browser URL, reported to observers.
    pub html_url: String,
    /// HTTPS clone URL, used for pushing.
    pub clone_url: String,
}

/// Errors raised while creating or pushing a repository.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("GitHub API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Organization or user '{0}' not found, or token lacks permission (needs 'repo' and 'admin:org')")]
    OwnerNotFound(String),

    #[error("Authentication failed or token lacks 'repo' permission")]
    Unauthorized,

    #[error("git {step} failed: {message}")]
    Git { step: &'static str, message: String },

    #[error("git {step} timed out after {secs} seconds")]
    Timeout { step: &'static str, secs: u64 },

    #[error("Invalid file path in generated project: {0}")]
    InvalidPath(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Creates repositories and transfers project directories into them.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create an empty repository, under `org` when given, else the token's user.
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        org: Option<&str>,
    ) -> Result<Repository, PublishError>;

    /// Commit everything under `dir` and push it to `clone_url`.
    async fn push_directory(
        &self,
        clone_url: &str,
        dir: &Path,
        commit_message: &str,
    ) -> Result<(), PublishError>;
}
