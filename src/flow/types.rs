// SPDX-License-Identifier: MIT

//! Core data types for a run
//!
//! A [`WorkUnit`] is one configured agent. A run turns an ordered list of
//! units into one [`StatusEntry`] per unit, each moving through
//! [`RunStatus`] exactly once.

use crate::adk::model::GenerationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier of a unit within one run
pub type UnitId = String;

/// Numeric sampling parameters handed to the provider
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UnitParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for UnitParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1500,
            top_p: 0.95,
        }
    }
}

/// One configured agent
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkUnit {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub params: UnitParams,
    /// Image URL forwarded to providers that accept attachments
    #[serde(default)]
    pub attachment: Option<String>,
    /// Units that must succeed before this one may run
    #[serde(default)]
    pub dependencies: Vec<UnitId>,
}

impl WorkUnit {
    pub fn new(id: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            category: None,
            provider: provider.into(),
            model: model.into(),
            instructions: String::new(),
            params: UnitParams::default(),
            attachment: None,
            dependencies: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_attachment(mut self, url: impl Into<String>) -> Self {
        self.attachment = Some(url.into());
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(self.params.temperature),
            max_output_tokens: Some(self.params.max_tokens),
            top_p: Some(self.params.top_p),
        }
    }
}

/// Dependency specification (single string or array)
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(untagged)]
pub enum DependsOn {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl DependsOn {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            DependsOn::None => vec![],
            DependsOn::Single(s) => vec![s.clone()],
            DependsOn::Multiple(v) => v.clone(),
        }
    }
}

/// Lifecycle of a unit within a run
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Scheduled,
    Running,
    Success,
    Error,
    Skipped,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error | RunStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Scheduled => "scheduled",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Error => "error",
            RunStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of one unit in a run
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StatusEntry {
    pub unit_id: UnitId,
    /// 1-based registration position
    pub position: usize,
    pub name: String,
    pub provider: String,
    pub model: String,
    pub prompt: String,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failed ancestor that caused a skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<UnitId>,
    /// Seconds from `running` to the terminal transition
    pub elapsed_s: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
}

impl StatusEntry {
    pub fn scheduled(unit: &WorkUnit, position: usize, prompt: &str) -> Self {
        Self {
            unit_id: unit.id.clone(),
            position,
            name: unit.name.clone(),
            provider: unit.provider.clone(),
            model: unit.model.clone(),
            prompt: prompt.to_string(),
            status: RunStatus::Scheduled,
            output: None,
            error: None,
            blocked_by: None,
            elapsed_s: None,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    /// Display label, e.g. `Agent 2: Summarizer`
    pub fn label(&self) -> String {
        format!("Agent {}: {}", self.position, self.name)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
