//! The provider contract
//!
//! One object-safe trait instead of an inheritance tree: every adapter
//! implements the base surface and advertises optional capabilities through
//! [`Capability`] tags. The routing engine tag-tests before dispatching; the
//! optional operations default to [`GatewayError::Unsupported`] so an
//! adapter only writes the methods it backs.

use async_trait::async_trait;

use crate::core::types::{
    ChatRequest, ChatResponse, ChunkStream, EmbeddingRequest, EmbeddingResponse, GatewayError,
    ImageRequest, ImageResponse, ModelInfo, RequestContext,
};

/// Capability tags an adapter may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Non-streaming chat completion (every adapter)
    Completion,
    /// Incremental chat completion via [`Provider::complete_stream`]
    Streaming,
    /// Exposes base URL and auth headers for HTTP pass-through
    Proxy,
    /// Text embeddings
    Embeddings,
    /// Image generation
    ImageGeneration,
    /// Live model enumeration via [`Provider::discover_models`]
    ModelDiscovery,
}

/// Contract implemented by every back-end adapter.
///
/// Adapters own translation in both directions: normalised request to wire
/// body, wire response back to the normalised shape, with `provider` stamped
/// on everything they hand out.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Registry key; unique, case-sensitive
    fn name(&self) -> &str;

    /// Capabilities this adapter backs
    fn capabilities(&self) -> &[Capability];

    /// Known model ids. A hint for enumeration callers; may be a static
    /// list and need not be exhaustive.
    fn supported_models(&self) -> Vec<String>;

    /// Cheap predicate for routing. Adapters that cannot enumerate are
    /// permissive and defer validation to the upstream.
    fn supports_model(&self, model: &str) -> bool;

    /// `supported_models` as listing entries
    fn models_info(&self) -> Vec<ModelInfo> {
        self.supported_models()
            .into_iter()
            .map(|id| ModelInfo::new(id, self.name()))
            .collect()
    }

    /// Execute a chat completion against the upstream.
    ///
    /// Returns only once the upstream call resolves; no background work
    /// outlives the future. Honours `ctx.cancellation`.
    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError>;

    /// Stream a chat completion.
    ///
    /// The returned stream has a single producer that closes on `[DONE]`,
    /// EOF, error (yielded as a final `Err` item), or cancellation.
    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let _ = (ctx, request);
        Err(GatewayError::unsupported(self.name(), "streaming"))
    }

    /// Upstream base URL, for proxy pass-through collaborators
    fn base_url(&self) -> Option<&str> {
        None
    }

    /// Headers a pass-through caller must attach to reach the upstream
    fn auth_headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Embed text
    async fn embed(
        &self,
        ctx: &RequestContext,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, GatewayError> {
        let _ = (ctx, request);
        Err(GatewayError::unsupported(self.name(), "embeddings"))
    }

    /// Generate images
    async fn generate_image(
        &self,
        ctx: &RequestContext,
        request: &ImageRequest,
    ) -> Result<ImageResponse, GatewayError> {
        let _ = (ctx, request);
        Err(GatewayError::unsupported(self.name(), "image generation"))
    }

    /// Enumerate models live from the upstream. The core exposes the hook
    /// but schedules no refreshes.
    async fn discover_models(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<ModelInfo>, GatewayError> {
        let _ = ctx;
        Err(GatewayError::unsupported(self.name(), "model discovery"))
    }
}

/// Prefix predicate shared by namespace-scoped adapters
pub(crate) fn model_has_prefix(model: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| model.starts_with(prefix))
}
