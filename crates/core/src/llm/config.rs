// crates/core/src/llm/config.rs
//! LLM provider configuration types.

/// Configuration for an LLM provider instance.
#[derive(Clone)]
pub struct LlmConfig {
    pub provider: ProviderType,
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Supported LLM provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    DeepSeek,
    OpenAi,
}

impl ProviderType {
    /// Key used by API requests to select this provider.
    pub fn key(self) -> &'static str {
        match self {
            ProviderType::DeepSeek => "deepseek",
            ProviderType::OpenAi => "openai",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "deepseek" => Some(ProviderType::DeepSeek),
            "openai" => Some(ProviderType::OpenAi),
            _ => None,
        }
    }
}

impl LlmConfig {
    pub fn deepseek(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            provider: ProviderType::DeepSeek,
            model: "deepseek-chat".into(),
            api_key: Some(api_key.into()),
            endpoint: endpoint.into(),
            timeout_secs: 300,
        }
    }

    pub fn openai(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            provider: ProviderType::OpenAi,
            model: "gpt-4-turbo-preview".into(),
            api_key: Some(api_key.into()),
            endpoint: endpoint.into(),
            timeout_secs: 300,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
