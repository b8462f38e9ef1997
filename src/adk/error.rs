// SPDX-License-Identifier: MIT

//! Typed error handling for agentflow-rs
//!
//! Only [`ValidationError`] and [`CredentialError`] abort a run before any
//! unit is dispatched. [`ExecutionError`] and [`StallError`] are recorded on
//! individual units and never escape the engine.

use thiserror::Error;

/// Top-level error type for agentflow-rs
#[derive(Debug, Error)]
pub enum FlowError {
    /// Malformed unit graph
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Required provider credentials are not available
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Configuration errors (bad unit file, unresolvable provider/model)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The background run task ended abnormally
    #[error("Run aborted: {0}")]
    Runtime(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Structural problems in a unit set, detected before a run starts
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two units share an id
    #[error("Duplicate unit id: '{0}'")]
    DuplicateId(String),

    /// A unit lists itself as a dependency
    #[error("Unit '{0}' depends on itself")]
    SelfDependency(String),

    /// A unit has a blank id
    #[error("Unit at position {position} has an empty id")]
    EmptyId { position: usize },
}

/// One or more providers referenced by the run have no credential
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Missing API keys for providers: {}", .missing.join(", "))]
pub struct CredentialError {
    /// Every missing provider, in first-use order
    pub missing: Vec<String>,
}

/// Failure of a single unit's work
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// No implementation is registered for the provider
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// The credential set handed to the executor lacks this provider
    #[error("{0} API key is not set.")]
    CredentialMissing(String),

    /// Non-success response from a provider API
    #[error("{provider} API Error: {message}")]
    Api { provider: String, message: String },

    /// Rate limit exceeded
    #[error("{provider} API Error: rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The provider answered with something we could not interpret
    #[error("{provider} API Error: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// HTTP transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure reported by a custom executor
    #[error("{0}")]
    Failed(String),
}

impl ExecutionError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<&str> for ExecutionError {
    fn from(s: &str) -> Self {
        Self::Failed(s.to_string())
    }
}

impl From<String> for ExecutionError {
    fn from(s: String) -> Self {
        Self::Failed(s)
    }
}

/// Why a pending unit could not make progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StallCause {
    /// Depends on ids that are not part of the run
    MissingDependencies(Vec<String>),
    /// Depends on units that already failed or were skipped
    FailedDependencies(Vec<String>),
    /// Waits on other pending units that can never become ready
    Unresolved(Vec<String>),
}

/// Diagnostic recorded on a unit finalized by the stall detector
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Circular dependency or stalled graph: {}", describe(.cause))]
pub struct StallError {
    pub unit: String,
    pub cause: StallCause,
}

fn describe(cause: &StallCause) -> String {
    match cause {
        StallCause::MissingDependencies(ids) => {
            format!("depends on unknown unit(s) {}", ids.join(", "))
        }
        StallCause::FailedDependencies(ids) => {
            format!("depends on failed unit(s) {}", ids.join(", "))
        }
        StallCause::Unresolved(ids) => {
            format!("waiting on unit(s) {} that can never run", ids.join(", "))
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
