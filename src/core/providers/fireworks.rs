//! Fireworks AI adapter (OpenAI-compatible under `/inference/v1`)

use async_trait::async_trait;

use super::base::AuthScheme;
use super::openai_compat::CompatClient;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, GatewayError, ModelInfo, RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";

const KNOWN_MODELS: &[&str] = &[
    "accounts/fireworks/models/llama-v3p1-70b-instruct",
    "accounts/fireworks/models/llama-v3p1-8b-instruct",
    "accounts/fireworks/models/mixtral-8x7b-instruct",
];

/// Fireworks AI provider
pub struct FireworksProvider {
    client: CompatClient,
}

impl FireworksProvider {
    /// Adapter against api.fireworks.ai
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: CompatClient::new("fireworks", base_url, AuthScheme::Bearer(api_key.into())),
        }
    }
}

#[async_trait]
impl Provider for FireworksProvider {
    fn name(&self) -> &str {
        "fireworks"
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
