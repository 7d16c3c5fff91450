//! OpenAI adapter
//!
//! The reference back-end: the normalised model IS this wire format, so the
//! adapter is a direct pass-through over [`CompatClient`] with the full
//! capability set.

use async_trait::async_trait;

use super::base::AuthScheme;
use super::openai_compat::CompatClient;
use crate::core::traits::provider::model_has_prefix;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, EmbeddingRequest, EmbeddingResponse, GatewayError,
    ImageRequest, ImageResponse, ModelInfo, RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const MODEL_PREFIXES: &[&str] = &[
    "gpt-",
    "chatgpt-",
    "o1",
    "o3",
    "o4",
    "text-embedding-",
    "dall-e",
];

const KNOWN_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-4.1-mini",
    "o3-mini",
    "text-embedding-3-small",
    "text-embedding-3-large",
    "dall-e-3",
];

/// OpenAI provider
pub struct OpenAiProvider {
    client: CompatClient,
}

impl OpenAiProvider {
    /// Adapter against api.openai.com
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against a self-hosted or mock endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: CompatClient::new("openai", base_url, AuthScheme::Bearer(api_key.into())),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Completion,
            Capability::Streaming,
            Capability::Proxy,
            Capability::Embeddings,
            Capability::ImageGeneration,
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

    async fn generate_image(
        &self,
        ctx: &RequestContext,
        request: &ImageRequest,
    ) -> Result<ImageResponse, GatewayError> {
        self.client.images(ctx, request).await
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
    fn model_predicate_covers_known_models() {
        let provider = OpenAiProvider::new("sk-test");
        for model in provider.supported_models() {
            assert!(provider.supports_model(&model), "should support {model}");
        }
        assert!(provider.supports_model("gpt-5-preview"));
        assert!(!provider.supports_model("claude-3-opus"));
    }

    #[test]
    fn proxy_surface_exposes_credentials() {
        let provider = OpenAiProvider::with_base_url("sk-test", "https://proxy.local/v1/");
        assert_eq!(provider.base_url(), Some("https://proxy.local/v1"));
        assert_eq!(
            provider.auth_headers(),
            vec![("Authorization".to_string(), "Bearer sk-test".to_string())]
        );
    }
}
