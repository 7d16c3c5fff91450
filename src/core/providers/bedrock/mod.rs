//! AWS Bedrock adapter
//!
//! One `invoke` surface fronting several model families; the family decides
//! the body schema (see [`transform`]). Requests are SigV4-signed with
//! credentials given at construction or resolved from the environment.
//! Streaming is implemented for the Anthropic family only and decodes the
//! binary event-stream framing in [`eventstream`]; the other families
//! deliberately refuse `complete_stream`.

pub mod eventstream;
pub mod sigv4;
pub mod transform;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use super::anthropic::streaming::{AnthropicEventState, Applied};
use super::base::trim_base_url;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChunkStream, GatewayError, RequestContext,
};

use eventstream::EventStreamDecoder;
use sigv4::SigV4Signer;
use transform::ModelFamily;

const KNOWN_MODELS: &[&str] = &[
    "anthropic.claude-3-5-sonnet-20241022-v2:0",
    "anthropic.claude-3-haiku-20240307-v1:0",
    "amazon.titan-text-express-v1",
    "meta.llama3-70b-instruct-v1:0",
];

/// AWS Bedrock provider
pub struct BedrockProvider {
    region: String,
    base_url: String,
    signer: SigV4Signer,
    http: reqwest::Client,
}

impl BedrockProvider {
    /// Adapter with static credentials
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self::with_session_token(access_key, secret_key, None, region)
    }

    /// Adapter with static credentials and an STS session token
    pub fn with_session_token(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
        region: impl Into<String>,
    ) -> Self {
        let region = region.into();
        Self {
            base_url: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            signer: SigV4Signer::new(access_key, secret_key, session_token, region.clone()),
            region,
            http: reqwest::Client::new(),
        }
    }

    /// Adapter with credentials resolved from the standard AWS environment
    /// variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
    /// `AWS_SESSION_TOKEN`, `AWS_REGION`).
    pub fn from_env() -> Result<Self, GatewayError> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| GatewayError::configuration("AWS_ACCESS_KEY_ID is not set"))?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| GatewayError::configuration("AWS_SECRET_ACCESS_KEY is not set"))?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();
        let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        Ok(Self::with_session_token(
            access_key,
            secret_key,
            session_token,
            region,
        ))
    }

    /// Point the adapter at a non-AWS endpoint (tests, private gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = trim_base_url(base_url);
        self
    }

    /// Region the signer is scoped to
    pub fn region(&self) -> &str {
        &self.region
    }

    async fn invoke(
        &self,
        ctx: &RequestContext,
        url: String,
        body: &Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let payload = serde_json::to_vec(body)?;
        let signed = self
            .signer
            .sign("POST", &url, &payload, chrono::Utc::now())?;

        let mut send = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(payload);
        for (name, value) in signed {
            send = send.header(name, value);
        }

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            response = send.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
                body = response.text() => body.unwrap_or_default(),
            };
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(GatewayError::provider("bedrock", status.as_u16(), message));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        "bedrock"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Completion, Capability::Streaming]
    }

    fn supported_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }

    // Bedrock hosts heterogeneous families; family fit is checked at invoke
    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let family = ModelFamily::of(&request.model)?;
        let body = transform::build_body(family, request);
        let url = format!("{}/model/{}/invoke", self.base_url, request.model);

        let response = self.invoke(ctx, url, &body).await?;
        let payload: Value = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("bedrock response: {err}")))?,
        };

        let (text, finish, usage) = transform::parse_body(family, &payload);
        Ok(ChatResponse {
            id: payload
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("bedrock-{}", uuid::Uuid::new_v4().simple())),
            model: request.model.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: finish,
            }],
            usage,
            ..ChatResponse::default()
        }
        .tagged("bedrock"))
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let family = ModelFamily::of(&request.model)?;
        if family != ModelFamily::Anthropic {
            return Err(GatewayError::unsupported(
                "bedrock",
                "streaming for non-anthropic model families",
            ));
        }

        let body = transform::build_body(family, request);
        let url = format!(
            "{}/model/{}/invoke-with-response-stream",
            self.base_url, request.model
        );
        let response = self.invoke(ctx, url, &body).await?;

        let cancellation = ctx.cancellation.clone();
        let fallback_model = request.model.clone();

        Ok(Box::pin(async_stream::stream! {
            let frames = response.bytes_stream();
            futures::pin_mut!(frames);
            let mut decoder = EventStreamDecoder::new();
            let mut state = AnthropicEventState::new(fallback_model);

            'read: loop {
                let next = tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => break 'read,
                    next = frames.next() => next,
                };
                let bytes = match next {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(err)) => {
                        yield Err(GatewayError::network(format!("stream read error: {err}")));
                        break 'read;
                    }
                    None => break 'read,
                };
                let events = match decoder.push(&bytes) {
                    Ok(events) => events,
                    Err(err) => {
                        yield Err(err);
                        break 'read;
                    }
                };
                for event in events {
                    if cancellation.is_cancelled() {
                        break 'read;
                    }
                    match state.apply(&event) {
                        Ok(Applied::Chunk(chunk)) => yield Ok(chunk),
                        Ok(Applied::Skip) => {}
                        Ok(Applied::Done) => break 'read,
                        Err(err) => {
                            yield Err(err);
                            break 'read;
                        }
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_anthropic_streaming_refused() {
        let provider = BedrockProvider::new("key", "secret", "us-east-1");
        let request = ChatRequest::new("amazon.titan-text-express-v1").user("hi");
        let err = provider
            .complete_stream(&RequestContext::new(), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Unsupported { .. }));
    }

    #[tokio::test]
    async fn unknown_family_rejected() {
        let provider = BedrockProvider::new("key", "secret", "us-east-1");
        let request = ChatRequest::new("cohere.command-text-v14").user("hi");
        let err = provider
            .complete(&RequestContext::new(), &request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("model family"));
    }

    #[test]
    fn region_shapes_default_endpoint() {
        let provider = BedrockProvider::new("key", "secret", "eu-central-1");
        assert_eq!(
            provider.base_url,
            "https://bedrock-runtime.eu-central-1.amazonaws.com"
        );
    }
}
