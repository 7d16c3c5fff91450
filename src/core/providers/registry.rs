//! Provider registry
//!
//! In-memory index of provider instances keyed by name. Registration is
//! expected to finish before routing starts; after that, reads are safe to
//! share. Insertion order is kept so `find_by_model` ties break toward the
//! first registered provider, deterministically.

use std::sync::Arc;

use crate::core::traits::Provider;
use crate::core::types::ModelInfo;

/// Registry of provider instances
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider; replaces an existing one with the same name in
    /// place, keeping its position in the iteration order.
    pub fn register(&mut self, provider: impl Provider + 'static) {
        self.register_arc(Arc::new(provider));
    }

    /// Register an already-shared provider
    pub fn register_arc(&mut self, provider: Arc<dyn Provider>) {
        match self
            .providers
            .iter_mut()
            .find(|existing| existing.name() == provider.name())
        {
            Some(slot) => *slot = provider,
            None => self.providers.push(provider),
        }
    }

    /// Look up a provider by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.name() == name)
            .cloned()
    }

    /// Registered names, in registration order
    pub fn list(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|provider| provider.name().to_string())
            .collect()
    }

    /// Every provider's model listing concatenated
    pub fn all_models(&self) -> Vec<ModelInfo> {
        self.providers
            .iter()
            .flat_map(|provider| provider.models_info())
            .collect()
    }

    /// First registered provider whose `supports_model` accepts `model`
    pub fn find_by_model(&self, model: &str) -> Option<Arc<dyn Provider>> {
        self.providers
            .iter()
            .find(|provider| provider.supports_model(model))
            .cloned()
    }

    /// True when `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.providers.iter().any(|provider| provider.name() == name)
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list())
            .finish()
    }
}
