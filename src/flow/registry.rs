// SPDX-License-Identifier: MIT

use crate::adk::error::ExecutionError;
use crate::adk::model::gemini::GeminiProvider;
use crate::adk::model::openai::OpenAiProvider;
use crate::adk::model::ModelProvider;
use crate::config::Settings;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Model providers keyed by lower-case provider id
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<HashMap<String, Arc<dyn ModelProvider>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry with the built-in gemini, openai and grok providers
    pub fn with_defaults(settings: &Settings) -> Result<Self, ExecutionError> {
        let builtins: Vec<Arc<dyn ModelProvider>> = vec![
            Arc::new(GeminiProvider::new(settings)?),
            Arc::new(OpenAiProvider::openai(settings)?),
            Arc::new(OpenAiProvider::grok(settings)?),
        ];
        let map = builtins
            .into_iter()
            .map(|p| (p.id().to_ascii_lowercase(), p))
            .collect();
        Ok(Self {
            providers: Arc::new(RwLock::new(map)),
        })
    }

    pub async fn register(&self, provider: Arc<dyn ModelProvider>) {
        let mut providers = self.providers.write().await;
        providers.insert(provider.id().to_ascii_lowercase(), provider);
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn ModelProvider>> {
        let providers = self.providers.read().await;
        providers.get(&id.to_ascii_lowercase()).cloned()
    }

    /// Registered ids, sorted
    pub async fn ids(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut ids: Vec<String> = providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::GenerationRequest;
    use async_trait::async_trait;

    /// A mock provider for testing
    struct MockProvider {
        id: String,
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        fn id(&self) -> &str {
            &self.id
        }

        fn display_name(&self) -> &str {
            "Mock"
        }

        async fn generate_content(
            &self,
            _request: &GenerationRequest,
            _api_key: &str,
        ) -> Result<String, ExecutionError> {
            Ok("mock".to_string())
        }
    }

    #[tokio::test]
    async fn test_registry_register_and_get() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(MockProvider {
                id: "Mock".to_string(),
            }))
            .await;

        let provider = registry.get("mock").await;
        assert!(provider.is_some());
        assert_eq!(provider.unwrap().display_name(), "Mock");
        assert!(registry.get("MOCK").await.is_some());
    }

    #[tokio::test]
    async fn test_registry_get_nonexistent() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn test_registry_defaults() {
        let registry = ProviderRegistry::with_defaults(&Settings::default()).unwrap();
        assert_eq!(registry.ids().await, vec!["gemini", "grok", "openai"]);
        assert_eq!(registry.get("grok").await.unwrap().display_name(), "Grok");
    }

    #[tokio::test]
    async fn test_registry_clone_shares_providers() {
        let registry = ProviderRegistry::new();
        let clone = registry.clone();
        clone
            .register(Arc::new(MockProvider {
                id: "shared".to_string(),
            }))
            .await;
        assert!(registry.get("shared").await.is_some());
    }
}
