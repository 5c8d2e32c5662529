// crates/core/src/llm/types.rs
//! Request/response/error types for LLM integration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One file of a generated project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub content: String,
    /// Language hint (go, py, js, md, ...).
    #[serde(rename = "type", default)]
    pub file_type: String,
}

/// Complete project returned by a content producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub files: Vec<FileInfo>,
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No response from {0} API")]
    EmptyResponse(String),

    #[error("Response appears to be truncated, please simplify your prompt or reduce project complexity")]
    Truncated,

    #[error("Failed to parse JSON response: {message}. Preview: {preview}")]
    ParseFailed { message: String, preview: String },

    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

/// Strip a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    let body = match rest.rfind("```") {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    body.trim()
}

/// Parse a model's raw reply into a [`GeneratedProject`].
pub fn parse_project(raw: &str) -> Result<GeneratedProject, LlmError> {
    let content = extract_json(raw);
    if !(content.ends_with('}') || content.ends_with(']')) {
        return Err(LlmError::Truncated);
    }
    serde_json::from_str(content).map_err(|e| LlmError::ParseFailed {
        message: e.to_string(),
        preview: preview(content),
    })
}

fn preview(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= 500 {
        return content.to_string();
    }
    let head: String = chars[..500].iter().collect();
    let tail: String = chars[chars.len() - 100..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_strips_fences() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(extract_json("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_project() {
        let raw = r##"```json
{
  "name": "todo",
  "description": "A todo app",
  "files": [
    {"path": "main.go", "content": "package main", "type": "go"},
    {"path": "README.md", "content": "# todo"}
  ]
}
```"##;
        let project = parse_project(raw).unwrap();
        assert_eq!(project.name, "todo");
        assert_eq!(project.description, "A todo app");
        assert_eq!(project.files.len(), 2);
        assert_eq!(project.files[0].file_type, "go");
        assert_eq!(project.files[1].file_type, "");
    }

    #[test]
    fn test_parse_project_truncated() {
        let err = parse_project("{\"name\": \"todo\", \"files\": [").unwrap_err();
        assert!(matches!(err, LlmError::Truncated));
    }

    #[test]
    fn test_parse_project_invalid_json() {
        let err = parse_project("{not json}").unwrap_err();
        match err {
            LlmError::ParseFailed { preview, .. } => assert_eq!(preview, "{not json}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_preview_shortens_long_content() {
        let long = "x".repeat(1000);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 603);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "Timeout after 30 seconds");

        let err = LlmError::Api {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert_eq!(err.to_string(), "API returned 401: unauthorized");
    }
}
