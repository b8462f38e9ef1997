// SPDX-License-Identifier: MIT

//! Unit loader - YAML file loading and parsing
//!
//! ```yaml
//! name: Review pipeline
//! agents:
//!   - id: extract
//!     name: Extractor
//!     provider: gemini
//!     instructions: Pull out the key facts.
//!   - id: review
//!     name: Reviewer
//!     model: gpt-4o-mini
//!     depends_on: extract
//!     params:
//!       temperature: 0.2
//! ```

use super::catalog;
use super::types::{DependsOn, UnitParams, WorkUnit};
use crate::adk::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level unit file
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct UnitFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub agents: Vec<UnitDefinition>,
}

/// One agent as written in the file
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct UnitDefinition {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default, alias = "desc")]
    pub description: String,
    pub category: Option<String>,
    /// Inferred from `model` when omitted
    pub provider: Option<String>,
    /// Defaults to the provider's first catalog model when omitted
    pub model: Option<String>,
    #[serde(default, alias = "system_prompt")]
    pub instructions: String,
    #[serde(default)]
    pub params: UnitParams,
    #[serde(default, alias = "image_url")]
    pub attachment: Option<String>,
    #[serde(default, alias = "dependencies")]
    pub depends_on: DependsOn,
}

impl UnitDefinition {
    /// Resolve defaults into a [`WorkUnit`]; `position` is 1-based
    pub fn into_unit(self, position: usize) -> Result<WorkUnit> {
        let id = self.id.unwrap_or_else(|| format!("agent_{}", position));

        let provider = match (&self.provider, &self.model) {
            (Some(p), _) => p.trim().to_ascii_lowercase(),
            (None, Some(m)) => catalog::infer_provider_from_model(m)
                .map(str::to_string)
                .ok_or_else(|| {
                    FlowError::Config(format!(
                        "Agent '{}': cannot infer provider from model '{}'",
                        id, m
                    ))
                })?,
            (None, None) => {
                return Err(FlowError::Config(format!(
                    "Agent '{}': either provider or model is required",
                    id
                )))
            }
        };

        let model = match self.model {
            Some(m) => m,
            None => catalog::default_model(&provider)
                .map(str::to_string)
                .ok_or_else(|| {
                    FlowError::Config(format!(
                        "Agent '{}': no default model for provider '{}'",
                        id, provider
                    ))
                })?,
        };

        Ok(WorkUnit {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            description: self.description,
            category: self.category,
            provider,
            model,
            instructions: self.instructions,
            params: self.params,
            attachment: self.attachment.filter(|a| !a.trim().is_empty()),
            dependencies: self.depends_on.to_vec(),
        })
    }
}

/// Loads unit definitions from YAML files
pub struct UnitLoader;

impl UnitLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load and resolve the units in a YAML file
    pub fn load_units<P: AsRef<Path>>(&self, path: P) -> Result<Vec<WorkUnit>> {
        let path = path.as_ref();
        log::debug!("Loading units from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse and resolve units from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Vec<WorkUnit>> {
        let file = Self::parse_file(content)?;
        file.agents
            .into_iter()
            .enumerate()
            .map(|(i, def)| def.into_unit(i + 1))
            .collect()
    }

    /// Parse the raw file without resolving defaults
    pub fn parse_file(content: &str) -> Result<UnitFile> {
        let file: UnitFile = serde_yaml::from_str(content)?;
        Ok(file)
    }
}

impl Default for UnitLoader {
    fn default() -> Self {
        Self::new()
    }
}
