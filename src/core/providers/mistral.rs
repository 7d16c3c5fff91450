//! Mistral adapter (OpenAI-compatible, plus `/embeddings`)

use async_trait::async_trait;

use super::base::AuthScheme;
use super::openai_compat::CompatClient;
use crate::core::traits::provider::model_has_prefix;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, EmbeddingRequest, EmbeddingResponse, GatewayError,
    ModelInfo, RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";

const MODEL_PREFIXES: &[&str] = &[
    "mistral-",
    "codestral-",
    "open-mistral-",
    "open-mixtral-",
    "pixtral-",
    "ministral-",
];

const KNOWN_MODELS: &[&str] = &[
    "mistral-large-latest",
    "mistral-small-latest",
    "codestral-latest",
    "pixtral-large-latest",
    "mistral-embed",
];

/// Mistral provider
pub struct MistralProvider {
    client: CompatClient,
}

impl MistralProvider {
    /// Adapter against api.mistral.ai
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: CompatClient::new("mistral", base_url, AuthScheme::Bearer(api_key.into())),
        }
    }
}

#[async_trait]
impl Provider for MistralProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Completion,
            Capability::Streaming,
            Capability::Proxy,
            Capability::Embeddings,
            Capability::ModelDiscovery,
        ]
    }

    fn supported_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }

    fn supports_model(&self, model: &str) -> bool {
        model_has_prefix(model, MODEL_PREFIXES)
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        self.client.chat(ctx, request).await
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        self.client.chat_stream(ctx, request).await
    }

    fn base_url(&self) -> Option<&str> {
        Some(self.client.base_url())
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        self.client.auth_headers()
    }

    async fn embed(
        &self,
        ctx: &RequestContext,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, GatewayError> {
        self.client.embeddings(ctx, request).await
    }

    async fn discover_models(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ModelInfo>, GatewayError> {
        self.client.models(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_predicate_covers_known_models() {
        let provider = MistralProvider::new("key");
        for model in provider.supported_models() {
            assert!(provider.supports_model(&model), "should support {model}");
        }
        assert!(provider.supports_model("ministral-8b-latest"));
        assert!(!provider.supports_model("llama-3.1-8b-instant"));
    }
}
