// SPDX-License-Identifier: MIT

//! Model module - defines the provider trait and shared request types
//!
//! Provider implementations are in their own submodules:
//! - [gemini] - Google's Gemini API
//! - [openai] - OpenAI-compatible chat completions (OpenAI, xAI Grok)

pub mod gemini;
pub mod openai;

use crate::adk::error::ExecutionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Plain text
    Text(String),
    /// Reference to an image the model should look at
    ImageUrl(String),
}

impl Content {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::ImageUrl(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Everything a provider needs for one completion
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub history: Vec<Content>,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    /// The system instruction, if the history starts with one
    pub fn system_instruction(&self) -> Option<String> {
        self.history
            .iter()
            .find(|c| c.role == "system")
            .map(Content::text)
            .filter(|t| !t.is_empty())
    }

    /// Non-system messages in order
    pub fn messages(&self) -> impl Iterator<Item = &Content> {
        self.history.iter().filter(|c| c.role != "system")
    }
}

/// One implementation per provider wire protocol
///
/// Implementations are looked up by [`ModelProvider::id`] in the
/// provider registry, so adding a provider never touches the scheduler.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Lower-case provider id used in unit definitions (e.g. `gemini`)
    fn id(&self) -> &str;

    /// Human-readable provider name used in error messages
    fn display_name(&self) -> &str;

    /// Name used when the provider's API key is missing
    fn key_label(&self) -> &str {
        self.display_name()
    }

    /// Run a completion and return the model's text output
    async fn generate_content(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<String, ExecutionError>;
}

/// Map a non-success HTTP response onto an [`ExecutionError`]
pub(crate) async fn error_from_response(
    provider: &str,
    resp: reqwest::Response,
) -> ExecutionError {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return ExecutionError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs,
        };
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    ExecutionError::api(provider, format!("{} ({})", message, status))
}
