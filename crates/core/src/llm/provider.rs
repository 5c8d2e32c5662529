// crates/core/src/llm/provider.rs
//! LlmProvider trait defining the interface for content producers.

use async_trait::async_trait;

use super::types::{GeneratedProject, LlmError};

/// A content producer: turns a natural-language prompt into a set of files.
///
/// Implementations include:
/// - `OpenAiCompatProvider` — any OpenAI-compatible chat-completions API
///   (DeepSeek, OpenAI)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a complete project for `prompt`.
    async fn generate_project(&self, prompt: &str) -> Result<GeneratedProject, LlmError>;

    /// Provider name for logging/display (e.g. "deepseek", "openai").
    fn name(&self) -> &str;

    /// Model identifier (e.g. "deepseek-chat").
    fn model(&self) -> &str;
}
