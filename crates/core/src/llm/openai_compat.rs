// crates/core/src/llm/openai_compat.rs
//! Provider for OpenAI-compatible chat-completions APIs (DeepSeek, OpenAI).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::config::LlmConfig;
use super::provider::LlmProvider;
use super::types::{parse_project, GeneratedProject, LlmError};

const SYSTEM_PROMPT: &str = r#"You are a professional code generation assistant. Based on the user's requirements, generate a complete project structure and code.

Respond with JSON in exactly this format:
{
  "name": "project name",
  "description": "project description",
  "files": [
    {
      "path": "file path",
      "content": "file content (keep it concise)",
      "type": "file type (go/python/js/md etc.)"
    }
  ]
}

Important:
1. Generate at most 5 files
2. Keep each file concise and focused on core functionality
3. Keep README.md short and clear
4. Return complete, valid JSON; never truncate it
5. Escape strings inside file contents correctly
6. Supported file types: go, py, js, ts, md, json, yaml"#;

const TEMPERATURE: f32 = 0.7;
const MAX_TOKENS: u32 = 8000;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// LLM provider speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatProvider {
    name: &'static str,
    model: String,
    api_key: String,
    endpoint: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::NotAvailable(format!("no API key configured for {}", config.provider.key()))
            })?;
        Ok(Self {
            name: config.provider.key(),
            model: config.model.clone(),
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            client: reqwest::Client::new(),
        })
    }

    async fn chat(&self, user_prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.timeout_secs)
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Request(format!("invalid response body: {e}")))?;

        data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::EmptyResponse(self.name.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn generate_project(&self, prompt: &str) -> Result<GeneratedProject, LlmError> {
        let t0 = Instant::now();
        let user_prompt = format!("Generate a project for the following requirements:\n{prompt}");
        let content = self.chat(&user_prompt).await?;

        tracing::info!(
            provider = self.name,
            model = %self.model,
            latency_ms = t0.elapsed().as_millis() as u64,
            response_len = content.len(),
            "LLM generate_project(): response received"
        );

        parse_project(&content)
    }

    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(endpoint: &str) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new(&LlmConfig::deepseek("test-key", endpoint)).unwrap()
    }

    fn completion(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn test_new_requires_api_key() {
        let mut cfg = LlmConfig::openai("", "https://api.openai.com/v1");
        assert!(matches!(
            OpenAiCompatProvider::new(&cfg),
            Err(LlmError::NotAvailable(_))
        ));
        cfg.api_key = None;
        assert!(OpenAiCompatProvider::new(&cfg).is_err());
    }

    #[test]
    fn test_name_and_model() {
        let p = provider("https://api.deepseek.com/");
        assert_eq!(p.name(), "deepseek");
        assert_eq!(p.model(), "deepseek-chat");
        assert_eq!(p.endpoint, "https://api.deepseek.com");
    }

    #[tokio::test]
    async fn test_generate_project_success() {
        let mut server = mockito::Server::new_async().await;
        let project = r#"{"name":"hello","description":"Hello world","files":[{"path":"main.py","content":"print('hi')","type":"py"}]}"#;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(&format!("```json\n{project}\n```")))
            .create_async()
            .await;

        let result = provider(&server.url())
            .generate_project("hello world in python")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "hello");
        assert_eq!(result.files[0].path, "main.py");
    }

    #[tokio::test]
    async fn test_generate_project_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_project("anything")
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_project_no_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_project("anything")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No response from deepseek API");
    }

    #[tokio::test]
    async fn test_generate_project_truncated_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion("{\"name\":\"cut\",\"files\":[{\"path\":"))
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate_project("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Truncated));
    }
}
