// SPDX-License-Identifier: MIT

//! Runtime settings read from the environment
//!
//! | Variable                         | Default                                             |
//! |----------------------------------|-----------------------------------------------------|
//! | `AGENTFLOW_REQUEST_TIMEOUT_SECS` | `120`                                               |
//! | `GEMINI_BASE_URL`                | `https://generativelanguage.googleapis.com/v1beta`  |
//! | `OPENAI_BASE_URL`                | `https://api.openai.com/v1`                         |
//! | `GROK_BASE_URL`                  | `https://api.x.ai/v1`                               |

use crate::adk::error::{FlowError, Result};
use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GROK_BASE_URL: &str = "https://api.x.ai/v1";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Upper bound for a single provider HTTP call
    pub request_timeout: Duration,
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub grok_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            grok_base_url: DEFAULT_GROK_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults for unset variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let request_timeout = match lookup("AGENTFLOW_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    FlowError::Config(format!(
                        "AGENTFLOW_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        let url = |key: &str, default: String| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };

        Ok(Self {
            request_timeout,
            gemini_base_url: url("GEMINI_BASE_URL", defaults.gemini_base_url),
            openai_base_url: url("OPENAI_BASE_URL", defaults.openai_base_url),
            grok_base_url: url("GROK_BASE_URL", defaults.grok_base_url),
        })
    }
}
