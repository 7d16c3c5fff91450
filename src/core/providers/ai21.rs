//! AI21 adapter
//!
//! Two generations under one roof: Jamba models speak the OpenAI-compatible
//! chat endpoint, while legacy Jurassic (`j2-*`) models use the prompt-only
//! `/{model}/complete` endpoint keyed on the last user message. Jurassic has
//! no streaming; `complete_stream` on a `j2-` model fails immediately.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::AuthScheme;
use super::openai_compat::{parse_error_envelope, CompatClient};
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChunkStream, FinishReason, GatewayError,
    RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.ai21.com/studio/v1";

const KNOWN_MODELS: &[&str] = &["jamba-1.5-large", "jamba-1.5-mini", "j2-ultra", "j2-mid"];

fn is_jurassic(model: &str) -> bool {
    model.starts_with("j2-")
}

/// AI21 provider
pub struct Ai21Provider {
    client: CompatClient,
    http: reqwest::Client,
    api_key: String,
}

impl Ai21Provider {
    /// Adapter against api.ai21.com
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let api_key = api_key.into();
        Self {
            client: CompatClient::new("ai21", base_url, AuthScheme::Bearer(api_key.clone())),
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Jurassic completion: prompt is the last user message, the response's
    /// first completion becomes the assistant message.
    async fn complete_jurassic(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let prompt = request.last_user_text().ok_or_else(|| {
            GatewayError::validation("jurassic models require at least one user message")
        })?;

        let mut body = json!({ "prompt": prompt });
        if let Some(max_tokens) = request.max_tokens {
            body["maxTokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            body["topP"] = json!(top_p);
        }
        if let Some(stop) = &request.stop {
            body["stopSequences"] = json!(stop);
        }

        let url = format!("{}/{}/complete", self.client.base_url(), request.model);
        let send = self.http.post(&url).bearer_auth(&self.api_key).json(&body);

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            response = send.send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_envelope("ai21", status.as_u16(), &body));
        }

        let payload: Value = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("ai21 complete response: {err}")))?,
        };

        let text = payload
            .pointer("/completions/0/data/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let finish = payload
            .pointer("/completions/0/finishReason/reason")
            .and_then(Value::as_str)
            .map(|reason| match reason {
                "endoftext" | "stop" => FinishReason::Stop,
                "length" => FinishReason::Length,
                other => FinishReason::Other(other.to_string()),
            });

        Ok(ChatResponse {
            id: payload
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            model: request.model.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: finish,
            }],
            usage: None,
            ..ChatResponse::default()
        }
        .tagged("ai21"))
    }
}

#[async_trait]
impl Provider for Ai21Provider {
    fn name(&self) -> &str {
        "ai21"
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::Completion,
            Capability::Streaming,
            Capability::Proxy,
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
        if is_jurassic(&request.model) {
            self.complete_jurassic(ctx, request).await
        } else {
            self.client.chat(ctx, request).await
        }
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        if is_jurassic(&request.model) {
            return Err(GatewayError::unsupported(
                "ai21",
                "streaming for jurassic models",
            ));
        }
        self.client.chat_stream(ctx, request).await
    }

    fn base_url(&self) -> Option<&str> {
        Some(self.client.base_url())
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        self.client.auth_headers()
    }
}
