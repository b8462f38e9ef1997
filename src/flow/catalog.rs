// SPDX-License-Identifier: MIT

//! Known providers and their selectable models

use once_cell::sync::Lazy;

/// Provider id and its model options; the first option is the default
static CATALOG: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        ("openai", vec!["gpt-4o-mini", "gpt-4.1-mini", "gpt-5-nano"]),
        ("grok", vec!["grok-4-fast-reasoning", "grok-3-mini"]),
        ("gemini", vec!["gemini-2.5-flash", "gemini-flash-lite-latest"]),
    ]
});

/// Provider ids in catalog order
pub fn providers() -> Vec<&'static str> {
    CATALOG.iter().map(|(p, _)| *p).collect()
}

/// Model options for a provider (case-insensitive); empty if unknown
pub fn models_for(provider: &str) -> &'static [&'static str] {
    let provider = provider.to_ascii_lowercase();
    CATALOG
        .iter()
        .find(|(p, _)| *p == provider)
        .map(|(_, models)| models.as_slice())
        .unwrap_or(&[])
}

pub fn default_model(provider: &str) -> Option<&'static str> {
    models_for(provider).first().copied()
}

/// Infer provider from model name prefix
pub fn infer_provider_from_model(model_name: &str) -> Option<&'static str> {
    let name_lower = model_name.to_lowercase();
    if name_lower.starts_with("gemini") || name_lower.starts_with("models/gemini") {
        Some("gemini")
    } else if name_lower.starts_with("gpt") || name_lower.starts_with("o1") {
        Some("openai")
    } else if name_lower.starts_with("grok") {
        Some("grok")
    } else {
        None
    }
}
