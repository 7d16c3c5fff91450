//! Groq adapter
//!
//! OpenAI-compatible endpoint under `/openai/v1`. Groq hosts third-party
//! open-weight models, so the model predicate is permissive and validation
//! is deferred to the upstream.

use async_trait::async_trait;

use super::base::AuthScheme;
use super::openai_compat::CompatClient;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, GatewayError, ModelInfo, RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

const KNOWN_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "mixtral-8x7b-32768",
    "gemma2-9b-it",
];

/// Groq provider
pub struct GroqProvider {
    client: CompatClient,
}

impl GroqProvider {
    /// Adapter against api.groq.com
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: CompatClient::new("groq", base_url, AuthScheme::Bearer(api_key.into())),
        }
    }
}

#[async_trait]
impl Provider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Completion,
            Capability::Streaming,
            Capability::Proxy,
            Capability::ModelDiscovery,
        ]
    }

    fn supported_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }

    fn supports_model(&self, _model: &str) -> bool {
        true
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
    fn pass_through_predicate_accepts_anything() {
        let provider = GroqProvider::new("gsk-test");
        assert!(provider.supports_model("llama-3.3-70b-versatile"));
        assert!(provider.supports_model("some/future-model"));
    }
}
