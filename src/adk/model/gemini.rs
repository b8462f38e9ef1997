// SPDX-License-Identifier: MIT

//! Gemini Model - Google's Gemini API implementation

use super::{error_from_response, GenerationRequest, ModelProvider, Part};
use crate::adk::error::ExecutionError;
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const BLOCKED_PLACEHOLDER: &str = "[Response blocked due to safety settings. The content may have been flagged as harmful.]";
const EMPTY_PLACEHOLDER: &str = "[Empty response from Gemini. The model may not have generated any content or the response was blocked.]";

/// Google Gemini provider
pub struct GeminiProvider {
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(settings: &Settings) -> Result<Self, ExecutionError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: settings.gemini_base_url.clone(),
        })
    }

    /// Point the provider at a different endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(request: &GenerationRequest) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = request
            .messages()
            .map(|c| {
                let parts: Vec<serde_json::Value> = c
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::Text(t) => Some(json!({ "text": t })),
                        Part::ImageUrl(url) => {
                            log::warn!("Gemini does not fetch image URLs, dropping {}", url);
                            None
                        }
                    })
                    .collect();
                let role = if c.role == "model" { "model" } else { "user" };
                json!({ "role": role, "parts": parts })
            })
            .collect();

        let mut body = json!({ "contents": contents });

        if let Some(instruction) = request.system_instruction() {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        let cfg = &request.config;
        let mut generation = serde_json::Map::new();
        if let Some(t) = cfg.temperature {
            generation.insert("temperature".to_string(), json!(t));
        }
        if let Some(p) = cfg.top_p {
            generation.insert("topP".to_string(), json!(p));
        }
        if let Some(m) = cfg.max_output_tokens {
            generation.insert("maxOutputTokens".to_string(), json!(m));
        }
        if !generation.is_empty() {
            body["generationConfig"] = serde_json::Value::Object(generation);
        }

        body
    }

    /// Extract the text of the first candidate
    ///
    /// Missing text is not an error: Gemini answers safety blocks and empty
    /// generations with a 200, so those become placeholder output.
    fn parse_response(resp_json: &serde_json::Value) -> String {
        let candidate = resp_json["candidates"]
            .as_array()
            .and_then(|c| c.first());

        let text: String = candidate
            .and_then(|c| c["content"]["parts"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter(|p| !p["thought"].as_bool().unwrap_or(false))
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if !text.is_empty() {
            return text;
        }

        let finish_reason = candidate
            .and_then(|c| c.get("finishReason"))
            .and_then(|v| v.as_str());
        let prompt_blocked = resp_json["promptFeedback"]["blockReason"].is_string();

        if finish_reason == Some("SAFETY") || prompt_blocked {
            log::warn!("Gemini blocked response due to safety filters");
            BLOCKED_PLACEHOLDER.to_string()
        } else {
            log::warn!("Gemini returned no text (finish reason: {:?})", finish_reason);
            EMPTY_PLACEHOLDER.to_string()
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    fn id(&self) -> &str {
        "gemini"
    }

    fn display_name(&self) -> &str {
        "Gemini"
    }

    async fn generate_content(
        &self,
        request: &GenerationRequest,
        api_key: &str,
    ) -> Result<String, ExecutionError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, request.model);
        let body = Self::build_body(request);

        log::debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExecutionError::api("Gemini", e.to_string()))?;

        if !resp.status().is_success() {
            return Err(error_from_response("Gemini", resp).await);
        }

        let resp_json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ExecutionError::api("Gemini", e.to_string()))?;
        log::debug!("Gemini response: {}", resp_json);

        Ok(Self::parse_response(&resp_json))
    }
}
