// crates/core/src/publish/github.rs
//! GitHub publisher: REST API for repository creation, `git` CLI for pushing.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::{PublishError, Publisher, Repository};

/// Timeout applied to every `git` invocation.
const GIT_TIMEOUT_SECS: u64 = 120;

const COMMIT_AUTHOR_NAME: &str = "Gen Code Bot";
const COMMIT_AUTHOR_EMAIL: &str = "bot@gencode.dev";

/// Connection settings for [`GitHubPublisher`].
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub api_url: String,
    /// Organization used when a job names none; `None` creates under the
    /// token's own account.
    pub owner: Option<String>,
}

#[derive(Serialize)]
struct CreateRepoRequest<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
    auto_init: bool,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GitHubPublisher {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubPublisher {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Clone URL with the token embedded as HTTP basic credentials.
    fn authenticated_url(&self, clone_url: &str) -> Result<String, PublishError> {
        let mut url = reqwest::Url::parse(clone_url)
            .map_err(|e| PublishError::Git { step: "push", message: format!("invalid clone URL: {e}") })?;
        url.set_username("x-access-token")
            .and_then(|_| url.set_password(Some(&self.config.token)))
            .map_err(|_| PublishError::Git {
                step: "push",
                message: format!("cannot attach credentials to {clone_url}"),
            })?;
        Ok(url.to_string())
    }

    async fn git(&self, dir: &Path, step: &'static str, args: &[&str]) -> Result<(), PublishError> {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(GIT_TIMEOUT_SECS), cmd.output())
            .await
            .map_err(|_| PublishError::Timeout {
                step,
                secs: GIT_TIMEOUT_SECS,
            })?
            .map_err(|e| PublishError::Git {
                step,
                message: format!("failed to spawn git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PublishError::Git {
                step,
                message: stderr.trim().replace(&self.config.token, "***"),
            });
        }
        tracing::debug!(step, dir = %dir.display(), "git step complete");
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitHubPublisher {
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
        org: Option<&str>,
    ) -> Result<Repository, PublishError> {
        let org = org
            .or(self.config.owner.as_deref())
            .filter(|o| !o.is_empty());
        let path = match org {
            Some(org) => format!("/orgs/{org}/repos"),
            None => "/user/repos".to_string(),
        };
        let body = CreateRepoRequest {
            name,
            description,
            private: false,
            auto_init: false,
        };

        let resp = self
            .client
            .post(self.api(&path))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "gen-code")
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| PublishError::Request(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let repo: Repository = resp
                .json()
                .await
                .map_err(|e| PublishError::Request(format!("invalid response body: {e}")))?;
            tracing::info!(repo = %repo.html_url, "GitHub repository created");
            return Ok(repo);
        }

        let message = resp
            .json::<ApiErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        match (status.as_u16(), org) {
            (404, Some(org)) => Err(PublishError::OwnerNotFound(org.to_string())),
            (401 | 404, None) => Err(PublishError::Unauthorized),
            (code, _) => Err(PublishError::Api {
                status: code,
                message,
            }),
        }
    }

    async fn push_directory(
        &self,
        clone_url: &str,
        dir: &Path,
        commit_message: &str,
    ) -> Result<(), PublishError> {
        let remote = self.authenticated_url(clone_url)?;
        let author_name = format!("user.name={COMMIT_AUTHOR_NAME}");
        let author_email = format!("user.email={COMMIT_AUTHOR_EMAIL}");

        self.git(dir, "init", &["init", "--initial-branch=main"]).await?;
        self.git(dir, "add", &["add", "-A"]).await?;
        self.git(
            dir,
            "commit",
            &["-c", &author_name, "-c", &author_email, "commit", "-m", commit_message],
        )
        .await?;
        // The authenticated URL is passed per-invocation so the token never lands in .git/config.
        self.git(dir, "push", &["push", &remote, "HEAD:refs/heads/main"]).await?;

        tracing::info!(clone_url, "Project pushed");
        Ok(())
    }
}
