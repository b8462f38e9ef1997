// SPDX-License-Identifier: MIT

//! Credential lookup for model providers
//!
//! The engine only asks a [`CredentialStore`] whether a provider is usable
//! and, right before dispatch, snapshots the keys it needs into a
//! read-only [`Credentials`] set that is shared by every unit of the run.

use std::collections::HashMap;
use std::env;
use std::fmt;

/// Source of provider API keys
pub trait CredentialStore: Send + Sync {
    /// Returns the key for a provider, if one is configured
    fn credential(&self, provider: &str) -> Option<String>;

    /// Whether a usable key exists for the provider
    fn has_credential(&self, provider: &str) -> bool {
        self.credential(provider).is_some()
    }
}

/// Reads keys from environment variables
///
/// A provider `foo` is looked up as `FOO_API_KEY`. A few providers also
/// accept the vendor's own variable name (`GOOGLE_API_KEY`, `XAI_API_KEY`).
/// Empty values count as missing.
#[derive(Debug, Clone)]
pub struct EnvCredentialStore {
    aliases: HashMap<String, Vec<String>>,
}

impl EnvCredentialStore {
    pub fn new() -> Self {
        let mut aliases = HashMap::new();
        aliases.insert("gemini".to_string(), vec!["GOOGLE_API_KEY".to_string()]);
        aliases.insert("grok".to_string(), vec!["XAI_API_KEY".to_string()]);
        Self { aliases }
    }

    /// Register an extra environment variable for a provider
    pub fn with_alias(mut self, provider: &str, var: impl Into<String>) -> Self {
        self.aliases
            .entry(provider.to_ascii_lowercase())
            .or_default()
            .push(var.into());
        self
    }

    /// All variable names consulted for a provider, in lookup order
    pub fn variables_for(&self, provider: &str) -> Vec<String> {
        let provider = provider.to_ascii_lowercase();
        let mut vars = vec![format!("{}_API_KEY", provider.to_ascii_uppercase())];
        if let Some(extra) = self.aliases.get(&provider) {
            vars.extend(extra.iter().cloned());
        }
        vars
    }
}

impl Default for EnvCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for EnvCredentialStore {
    fn credential(&self, provider: &str) -> Option<String> {
        self.variables_for(provider)
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty())
    }
}

/// In-memory keys, mostly for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    keys: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: &str, key: impl Into<String>) -> Self {
        self.keys.insert(provider.to_ascii_lowercase(), key.into());
        self
    }
}

impl CredentialStore for StaticCredentialStore {
    fn credential(&self, provider: &str) -> Option<String> {
        self.keys
            .get(&provider.to_ascii_lowercase())
            .filter(|key| !key.trim().is_empty())
            .cloned()
    }
}

/// An API key that never shows up in logs
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Read-only keys for the providers used by one run
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    keys: HashMap<String, ApiKey>,
}

impl Credentials {
    /// Collect keys for the given providers; unknown ones are left out
    pub fn collect<'a>(
        store: &dyn CredentialStore,
        providers: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let keys = providers
            .into_iter()
            .filter_map(|p| {
                store
                    .credential(p)
                    .map(|key| (p.to_ascii_lowercase(), ApiKey(key)))
            })
            .collect();
        Self { keys }
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.keys
            .get(&provider.to_ascii_lowercase())
            .map(ApiKey::expose)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
