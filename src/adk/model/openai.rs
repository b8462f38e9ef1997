// SPDX-License-Identifier: MIT

//! OpenAI-compatible chat completions
//!
//! Serves both OpenAI and xAI Grok, which speak the same protocol behind
//! different base URLs. Only Grok gets image attachments forwarded.

use super::{error_from_response, Content, GenerationRequest, ModelProvider, Part};
use crate::adk::error::ExecutionError;
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Chat-completions provider
pub struct OpenAiProvider {
    client: Client,
    id: String,
    display_name: String,
    key_label: String,
    base_url: String,
    accepts_images: bool,
}

impl OpenAiProvider {
    /// OpenAI proper, at `settings.openai_base_url`
    pub fn openai(settings: &Settings) -> Result<Self, ExecutionError> {
        Ok(Self {
            client: build_client(settings)?,
            id: "openai".to_string(),
            display_name: "OpenAI".to_string(),
            key_label: "OpenAI".to_string(),
            base_url: settings.openai_base_url.clone(),
            accepts_images: false,
        })
    }

    /// xAI Grok, at `settings.grok_base_url`
    pub fn grok(settings: &Settings) -> Result<Self, ExecutionError> {
        Ok(Self {
            client: build_client(settings)?,
            id: "grok".to_string(),
            display_name: "Grok".to_string(),
            key_label: "Grok (xAI)".to_string(),
            base_url: settings.grok_base_url.clone(),
            accepts_images: true,
        })
    }

    /// Point the provider at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert internal Content to chat message format
    fn content_to_message(&self, content: &Content) -> serde_json::Value {
        let role = match content.role.as_str() {
            "system" => "system",
            "model" => "assistant",
            _ => "user",
        };

        let has_image = content
            .parts
            .iter()
            .any(|p| matches!(p, Part::ImageUrl(_)));

        if has_image && self.accepts_images && role == "user" {
            let parts: Vec<serde_json::Value> = content
                .parts
                .iter()
                .map(|p| match p {
                    Part::Text(t) => json!({ "type": "text", "text": t }),
                    Part::ImageUrl(url) => {
                        json!({ "type": "image_url", "image_url": { "url": url } })
                    }
                })
                .collect();
            return json!({ "role": role, "content": parts });
        }

        if has_image {
            log::warn!(
                "{} does not accept image attachments, sending text only",
                self.display_name
            );
        }

        json!({
            "role": role,
            "content": content.text()
        })
    }

    fn build_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = request
            .history
            .iter()
            .map(|c| self.content_to_message(c))
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages
        });

        let cfg = &request.config;
        if let Some(temp) = cfg.temperature {
            body["temperature"] = json!(temp);
        }
        if let Some(max_tokens) = cfg.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if let Some(top_p) = cfg.top_p {
            body["top_p"] = json!(top_p);
        }
        body
    }

    /// Pull the first choice's text out of a response
    fn parse_response(&self, response: &serde_json::Value) -> Result<String, ExecutionError> {
        let choices = response["choices"].as_array().ok_or_else(|| {
            ExecutionError::invalid_response(&self.display_name, "no choices in response")
        })?;

        let text = choices
            .first()
            .and_then(|c| c["message"]["content"].as_str())
            .filter(|t| !t.is_empty());

        Ok(match text {
            Some(t) => t.to_string(),
            None => format!("No response from {}.", self.display_name),
        })
    }
}

fn build_client(settings: &Settings) -> Result<Client, ExecutionError> {
    Ok(Client::builder().timeout(settings.request_timeout).build()?)
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn key_label(&self) -> &str {
        &self.key_label
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<String, ExecutionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(request);

        log::debug!(
            "{} request body: {}",
            self.display_name,
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::api(&self.display_name, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(error_from_response(&self.display_name, resp).await);
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExecutionError::api(&self.display_name, e.to_string()))?;
        log::debug!("{} response: {}", self.display_name, resp_json);

        self.parse_response(&resp_json)
    }
}
