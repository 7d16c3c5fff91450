//! Ollama adapter
//!
//! Local inference server speaking the OpenAI-compatible surface under
//! `/v1`. No credentials: the default endpoint is loopback.

use async_trait::async_trait;

use super::base::AuthScheme;
use super::openai_compat::CompatClient;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, GatewayError, ModelInfo, RequestContext,
};

const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Ollama provider
pub struct OllamaProvider {
    client: CompatClient,
}

impl OllamaProvider {
    /// Adapter against a local Ollama daemon
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Adapter against a remote daemon
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: CompatClient::new("ollama", base_url, AuthScheme::None),
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
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
        // Whatever the daemon has pulled; enumeration goes through discovery
        Vec::new()
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
    fn local_daemon_needs_no_credentials() {
        let provider = OllamaProvider::new();
        assert!(provider.auth_headers().is_empty());
        assert_eq!(provider.base_url(), Some("http://localhost:11434/v1"));
    }
}
