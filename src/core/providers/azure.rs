//! Azure OpenAI adapter
//!
//! The Chat Completions schema with Azure plumbing: the deployment name
//! lives in the URL, auth is the raw key in an `api-key` header, and every
//! request carries an `api-version` query parameter.

use async_trait::async_trait;

use super::base::{trim_base_url, AuthScheme};
use super::openai_compat::CompatClient;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, EmbeddingRequest, EmbeddingResponse, GatewayError,
    RequestContext,
};

/// Default `api-version` sent when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-10-21";

/// Azure OpenAI provider, bound to one resource + deployment
pub struct AzureOpenAiProvider {
    client: CompatClient,
    deployment: String,
}

impl AzureOpenAiProvider {
    /// Adapter for `https://{resource}.openai.azure.com` and a deployment.
    ///
    /// `endpoint` is the resource root; the adapter appends
    /// `/openai/deployments/{deployment}` itself.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self::with_api_version(api_key, endpoint, deployment, DEFAULT_API_VERSION)
    }

    /// Adapter pinned to a specific `api-version`
    pub fn with_api_version(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        let deployment = deployment.into();
        let base = format!(
            "{}/openai/deployments/{}",
            trim_base_url(endpoint),
            deployment
        );
        let client = CompatClient::new(
            "azure",
            base,
            AuthScheme::Header {
                name: "api-key",
                value: api_key.into(),
            },
        )
        .with_query("api-version", api_version);
        Self { client, deployment }
    }

    /// The configured deployment name
    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

#[async_trait]
impl Provider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Completion,
            Capability::Streaming,
            Capability::Proxy,
            Capability::Embeddings,
        ]
    }

    fn supported_models(&self) -> Vec<String> {
        vec![self.deployment.clone()]
    }

    // The deployment decides the model; accept whatever the caller names
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

    async fn embed(
        &self,
        ctx: &RequestContext,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, GatewayError> {
        self.client.embeddings(ctx, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_lands_in_url() {
        let provider =
            AzureOpenAiProvider::new("key", "https://res.openai.azure.com/", "gpt4o-prod");
        assert_eq!(
            provider.base_url(),
            Some("https://res.openai.azure.com/openai/deployments/gpt4o-prod")
        );
        assert_eq!(
            provider.auth_headers(),
            vec![("api-key".to_string(), "key".to_string())]
        );
    }
}
