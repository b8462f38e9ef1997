// SPDX-License-Identifier: MIT

//! Work executor - performs one unit's work
//!
//! The engine only ever talks to [`WorkExecutor`]. [`ProviderExecutor`] is the
//! production implementation: it turns a unit into a [`GenerationRequest`]
//! and hands it to the provider registered under the unit's provider id.

use super::registry::ProviderRegistry;
use super::types::WorkUnit;
use crate::adk::credentials::Credentials;
use crate::adk::error::ExecutionError;
use crate::adk::model::{Content, GenerationRequest, Part};
use crate::config::Settings;
use async_trait::async_trait;

#[async_trait]
pub trait WorkExecutor: Send + Sync {
    /// Run `unit` against the shared prompt and return its output text
    async fn run(
        &self,
        unit: &WorkUnit,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, ExecutionError>;
}

/// Dispatches units to LLM providers by provider id
pub struct ProviderExecutor {
    registry: ProviderRegistry,
}

impl ProviderExecutor {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ExecutionError> {
        Ok(Self::new(ProviderRegistry::with_defaults(settings)?))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// System instructions first, then the attachment and prompt as the user turn
    pub fn build_request(unit: &WorkUnit, prompt: &str) -> GenerationRequest {
        let mut parts = Vec::with_capacity(2);
        if let Some(url) = &unit.attachment {
            parts.push(Part::ImageUrl(url.clone()));
        }
        parts.push(Part::Text(prompt.to_string()));

        let mut history = Vec::with_capacity(2);
        if !unit.instructions.trim().is_empty() {
            history.push(Content::system(unit.instructions.clone()));
        }
        history.push(Content::user(parts));

        GenerationRequest {
            model: unit.model.clone(),
            history,
            config: unit.generation_config(),
        }
    }
}

#[async_trait]
impl WorkExecutor for ProviderExecutor {
    async fn run(
        &self,
        unit: &WorkUnit,
        prompt: &str,
        credentials: &Credentials,
    ) -> Result<String, ExecutionError> {
        let provider = self
            .registry
            .get(&unit.provider)
            .await
            .ok_or_else(|| ExecutionError::UnsupportedProvider(unit.provider.clone()))?;

        let api_key = credentials
            .get(&unit.provider)
            .ok_or_else(|| ExecutionError::CredentialMissing(provider.key_label().to_string()))?;

        let request = Self::build_request(unit, prompt);
        log::debug!(
            "Unit '{}' calling {} model {}",
            unit.id,
            provider.display_name(),
            request.model
        );
        provider.generate_content(&request, api_key).await
    }
}
