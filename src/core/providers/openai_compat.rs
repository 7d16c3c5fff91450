//! Shared wire core for OpenAI-compatible back-ends
//!
//! OpenAI, Groq, DeepSeek, Mistral, Together, Fireworks, Perplexity,
//! Ollama, Azure OpenAI, and AI21's Jamba endpoint all speak the Chat
//! Completions schema; they differ only in base URL, endpoint path, auth
//! scheme, and query decoration. Each thin adapter owns one [`CompatClient`]
//! and layers its model policy on top.

use futures::StreamExt;
use serde_json::Value;

use super::base::sse::data_lines;
use super::base::{discovery, trim_base_url, AuthScheme};
use crate::core::types::{
    ChatChunk, ChatRequest, ChatResponse, ChunkStream, EmbeddingRequest, EmbeddingResponse,
    GatewayError, ImageRequest, ImageResponse, ModelInfo, RequestContext,
};

/// HTTP client for one OpenAI-compatible upstream
#[derive(Debug, Clone)]
pub struct CompatClient {
    provider: String,
    base_url: String,
    auth: AuthScheme,
    query: Vec<(String, String)>,
    http: reqwest::Client,
}

impl CompatClient {
    /// Client for `base_url` with the given auth scheme. The base URL is
    /// trimmed of trailing slashes and should include any fixed path prefix
    /// (e.g. `/v1`, or Azure's `/openai/deployments/{name}`).
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        auth: AuthScheme,
    ) -> Self {
        Self {
            provider: provider.into(),
            base_url: trim_base_url(base_url),
            auth,
            query: Vec::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Append a fixed query pair to every request (Azure's `api-version`)
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Provider name used in error messages and response tagging
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Upstream base URL, trailing slash trimmed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credentials as header pairs, for proxy pass-through
    pub fn auth_headers(&self) -> Vec<(String, String)> {
        self.auth.headers()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(
        &self,
        ctx: &RequestContext,
        path: &str,
        body: &Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let request = self
            .auth
            .apply(self.http.post(self.endpoint(path)))
            .query(&self.query)
            .json(body);

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            response = request.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
                body = response.text() => body.unwrap_or_default(),
            };
            return Err(parse_error_envelope(&self.provider, status.as_u16(), &body));
        }
        Ok(response)
    }

    /// Non-streaming chat completion
    pub async fn chat(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let mut wire = request.clone();
        wire.stream = None;
        let body = serde_json::to_value(&wire)?;

        let response = self.post_json(ctx, "/chat/completions", &body).await?;
        let parsed: ChatResponse = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            parsed = response.json() => parsed.map_err(|err| {
                GatewayError::parsing(format!("{} chat response: {err}", self.provider))
            })?,
        };
        Ok(parsed.tagged(&self.provider))
    }

    /// Streaming chat completion.
    ///
    /// Each `data:` line parses into a [`ChatChunk`]; malformed lines are
    /// skipped silently, scanner-level read errors terminate the stream with
    /// a final error item.
    pub async fn chat_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let mut wire = request.clone();
        wire.stream = Some(true);
        let body = serde_json::to_value(&wire)?;

        let response = self.post_json(ctx, "/chat/completions", &body).await?;
        let provider = self.provider.clone();
        let lines = data_lines(response, ctx.cancellation.clone());

        Ok(Box::pin(async_stream::stream! {
            futures::pin_mut!(lines);
            while let Some(item) = lines.next().await {
                match item {
                    Ok(payload) => match serde_json::from_str::<ChatChunk>(&payload) {
                        Ok(chunk) => yield Ok(chunk),
                        Err(err) => {
                            tracing::debug!(
                                provider = %provider,
                                error = %err,
                                "skipping malformed stream chunk"
                            );
                        }
                    },
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }))
    }

    /// Text embeddings via `POST /embeddings`
    pub async fn embeddings(
        &self,
        ctx: &RequestContext,
        request: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse, GatewayError> {
        let body = serde_json::to_value(request)?;
        let response = self.post_json(ctx, "/embeddings", &body).await?;
        let mut parsed: EmbeddingResponse = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            parsed = response.json() => parsed.map_err(|err| {
                GatewayError::parsing(format!("{} embedding response: {err}", self.provider))
            })?,
        };
        parsed.provider = Some(self.provider.clone());
        Ok(parsed)
    }

    /// Image generation via `POST /images/generations`
    pub async fn images(
        &self,
        ctx: &RequestContext,
        request: &ImageRequest,
    ) -> Result<ImageResponse, GatewayError> {
        let body = serde_json::to_value(request)?;
        let response = self.post_json(ctx, "/images/generations", &body).await?;
        let mut parsed: ImageResponse = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            parsed = response.json() => parsed.map_err(|err| {
                GatewayError::parsing(format!("{} image response: {err}", self.provider))
            })?,
        };
        parsed.provider = Some(self.provider.clone());
        Ok(parsed)
    }

    /// Live model discovery via `GET /models`
    pub async fn models(&self, ctx: &RequestContext) -> Result<Vec<ModelInfo>, GatewayError> {
        discovery::fetch_models(&self.http, &self.base_url, &self.auth, &self.provider, ctx).await
    }
}

/// Decode the `{"error": {"message": ...}}` envelope opportunistically;
/// anything that does not match surfaces the raw body instead.
pub fn parse_error_envelope(provider: &str, status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .or_else(|| value.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    GatewayError::provider(provider, status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_extracts_nested_message() {
        let body = r#"{"error": {"message": "invalid key", "type": "auth"}}"#;
        let err = parse_error_envelope("openai", 401, body);
        assert_eq!(err.to_string(), "openai API error (401): invalid key");
    }

    #[test]
    fn error_envelope_extracts_flat_message() {
        let body = r#"{"message": "upstream exploded"}"#;
        let err = parse_error_envelope("groq", 500, body);
        assert_eq!(err.to_string(), "groq API error (500): upstream exploded");
    }

    #[test]
    fn error_envelope_falls_back_to_raw_body() {
        let err = parse_error_envelope("ollama", 502, "<html>bad gateway</html>");
        assert_eq!(
            err.to_string(),
            "ollama API error (502): <html>bad gateway</html>"
        );
    }
}
