// crates/server/src/config.rs
//! Server configuration, from command-line flags with environment fallbacks.
//!
//! `main` loads a `.env` file (if any) before parsing, so every setting can
//! live there as well.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gencode_core::llm::{LlmConfig, ProviderType};
use gencode_core::publish::GitHubConfig;

use crate::generator::GeneratorConfig;

#[derive(Parser, Clone)]
#[command(name = "gencode", version, about = "Generate projects with an LLM and publish them to GitHub")]
pub struct Config {
    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, default_value = "")]
    pub github_token: String,

    /// Organization used when a request names none.
    #[arg(long, env = "GITHUB_OWNER", default_value = "")]
    pub github_owner: String,

    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub deepseek_api_key: Option<String>,

    #[arg(long, env = "DEEPSEEK_BASE_URL", default_value = "https://api.deepseek.com")]
    pub deepseek_base_url: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// Model key used when a request omits `model`.
    #[arg(long, env = "DEFAULT_MODEL", default_value = "deepseek")]
    pub default_model: String,

    #[arg(long, env = "MAX_CONCURRENT_TASKS", default_value_t = 5)]
    pub max_concurrent_tasks: usize,

    /// Seconds before a running job is failed.
    #[arg(long, env = "TASK_TIMEOUT", default_value_t = 600)]
    pub task_timeout: u64,

    #[arg(long, env = "TEMP_DIR", default_value = "./tmp")]
    pub temp_dir: PathBuf,

    /// Seconds between SSE keepalive comments.
    #[arg(long, env = "HEARTBEAT_SECS", default_value_t = 15)]
    pub heartbeat_secs: u64,
}

impl Config {
    /// Parse from the process arguments and environment, then validate.
    pub fn load() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.github_token.trim().is_empty() {
            bail!("GITHUB_TOKEN is required");
        }
        if self.llm_configs().is_empty() {
            bail!("at least one LLM API key is required (DEEPSEEK_API_KEY or OPENAI_API_KEY)");
        }
        let Some(provider) = ProviderType::from_key(&self.default_model) else {
            bail!(
                "DEFAULT_MODEL must be 'deepseek' or 'openai', got '{}'",
                self.default_model
            );
        };
        if !self.llm_configs().iter().any(|c| c.provider == provider) {
            bail!(
                "DEFAULT_MODEL is '{}' but no API key is configured for it",
                self.default_model
            );
        }
        if self.max_concurrent_tasks == 0 {
            bail!("MAX_CONCURRENT_TASKS must be at least 1");
        }
        if self.task_timeout == 0 {
            bail!("TASK_TIMEOUT must be at least 1 second");
        }
        if self.heartbeat_secs == 0 {
            bail!("HEARTBEAT_SECS must be at least 1 second");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    /// Producer presets for every configured key.
    pub fn llm_configs(&self) -> Vec<LlmConfig> {
        let mut configs = Vec::new();
        if let Some(key) = non_empty(&self.deepseek_api_key) {
            configs.push(LlmConfig::deepseek(key, &self.deepseek_base_url));
        }
        if let Some(key) = non_empty(&self.openai_api_key) {
            configs.push(LlmConfig::openai(key, &self.openai_base_url));
        }
        configs
    }

    pub fn github(&self) -> GitHubConfig {
        GitHubConfig {
            token: self.github_token.clone(),
            api_url: self.github_api_url.clone(),
            owner: Some(self.github_owner.trim())
                .filter(|o| !o.is_empty())
                .map(str::to_string),
        }
    }

    pub fn generator(&self) -> GeneratorConfig {
        GeneratorConfig {
            temp_dir: self.temp_dir.clone(),
            task_timeout: Duration::from_secs(self.task_timeout),
            max_concurrent: self.max_concurrent_tasks,
        }
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
