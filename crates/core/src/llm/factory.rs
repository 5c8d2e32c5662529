// crates/core/src/llm/factory.rs
//! Provider factory and the registry that maps request model keys to providers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::config::LlmConfig;
use super::openai_compat::OpenAiCompatProvider;
use super::provider::LlmProvider;
use super::types::LlmError;

/// Create an LLM provider based on the given configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    Ok(Arc::new(OpenAiCompatProvider::new(config)?))
}

/// Content producers available to jobs, keyed by the `model` field of a request.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build providers for every config that carries an API key.
    pub fn from_configs(configs: &[LlmConfig]) -> Result<Self, LlmError> {
        let mut registry = Self::new();
        for config in configs.iter().filter(|c| c.api_key.as_deref().is_some_and(|k| !k.is_empty())) {
            registry.insert(config.provider.key(), create_provider(config)?);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, key: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(key.into(), provider);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.providers.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}
