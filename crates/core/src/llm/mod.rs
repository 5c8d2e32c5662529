// crates/core/src/llm/mod.rs
//! LLM integration: the content producers invoked by generation jobs.
//!
//! Provides the `LlmProvider` trait and an implementation for
//! OpenAI-compatible chat-completions APIs (DeepSeek, OpenAI).

pub mod config;
pub mod factory;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use config::{LlmConfig, ProviderType};
pub use factory::{create_provider, ProviderRegistry};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::LlmProvider;
pub use types::{FileInfo, GeneratedProject, LlmError};
