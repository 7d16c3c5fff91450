//! Cohere adapter
//!
//! The v2 chat endpoint: messages are role/content pairs, the non-streaming
//! response carries typed content blocks and billed units nested under
//! `usage`, and the stream is typed events — `content-delta` holds the text
//! increment under `delta.message.content.text`, `message-end` the finish
//! reason and usage. Cohere's finish vocabulary (`COMPLETE`, `MAX_TOKENS`,
//! ...) is carried through verbatim.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use super::base::sse::data_lines;
use super::base::trim_base_url;
use crate::core::traits::provider::model_has_prefix;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatChoice, ChatChunk, ChatMessage, ChatRequest, ChatResponse, ChunkStream, FinishReason,
    GatewayError, MessageRole, RequestContext, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

const KNOWN_MODELS: &[&str] = &[
    "command-a-03-2025",
    "command-r-plus",
    "command-r",
    "embed-english-v3.0",
];

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::Tool => "tool",
    }
}

/// Build the `/v2/chat` body
pub(crate) fn chat_body(request: &ChatRequest, stream: bool) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .map(|message| json!({ "role": role_name(message.role), "content": message.text() }))
        .collect();

    let mut body = json!({ "model": request.model, "messages": messages });
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        body["p"] = json!(top_p);
    }
    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(stop) = &request.stop {
        body["stop_sequences"] = json!(stop);
    }
    if stream {
        body["stream"] = json!(true);
    }
    body
}

fn parse_billed_units(usage: &Value) -> Usage {
    Usage::new(
        usage
            .pointer("/billed_units/input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
        usage
            .pointer("/billed_units/output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32,
    )
}

/// Cohere provider
pub struct CohereProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl CohereProvider {
    /// Adapter against api.cohere.com
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: trim_base_url(base_url),
            http: reqwest::Client::new(),
        }
    }

    async fn send_chat(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let body = chat_body(request, stream);
        let send = self
            .http
            .post(format!("{}/v2/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

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
            return Err(GatewayError::provider("cohere", status.as_u16(), message));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
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

    fn supports_model(&self, model: &str) -> bool {
        model_has_prefix(model, &["command", "embed-", "rerank-"])
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let response = self.send_chat(ctx, request, false).await?;
        let payload: Value = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("cohere response: {err}")))?,
        };

        let text: String = payload
            .pointer("/message/content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| {
                        (block.get("type").and_then(Value::as_str) == Some("text"))
                            .then(|| block.get("text").and_then(Value::as_str))
                            .flatten()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let finish = payload
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(FinishReason::parse);
        let usage = payload.get("usage").map(parse_billed_units);

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
            usage,
            ..ChatResponse::default()
        }
        .tagged("cohere"))
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let response = self.send_chat(ctx, request, true).await?;
        let lines = data_lines(response, ctx.cancellation.clone());
        let model = request.model.clone();

        Ok(Box::pin(async_stream::stream! {
            futures::pin_mut!(lines);
            let mut stream_id = String::new();
            while let Some(item) = lines.next().await {
                match item {
                    Ok(payload) => {
                        let event: Value = match serde_json::from_str(&payload) {
                            Ok(event) => event,
                            Err(err) => {
                                tracing::debug!(error = %err, "skipping malformed cohere event");
                                continue;
                            }
                        };
                        match event.get("type").and_then(Value::as_str).unwrap_or("") {
                            "message-start" => {
                                if let Some(id) = event.get("id").and_then(Value::as_str) {
                                    stream_id = id.to_string();
                                }
                                yield Ok(ChatChunk::role(&stream_id, &model));
                            }
                            "content-delta" => {
                                let text = event
                                    .pointer("/delta/message/content/text")
                                    .and_then(Value::as_str)
                                    .unwrap_or("");
                                yield Ok(ChatChunk::content(&stream_id, &model, text));
                            }
                            "message-end" => {
                                let finish = event
                                    .pointer("/delta/finish_reason")
                                    .and_then(Value::as_str)
                                    .map(FinishReason::parse)
                                    .unwrap_or(FinishReason::Stop);
                                let usage = event
                                    .pointer("/delta/usage")
                                    .map(parse_billed_units);
                                yield Ok(ChatChunk::finish(&stream_id, &model, finish, usage));
                                break;
                            }
                            // content-start, content-end, and friends
                            _ => continue,
                        }
                    }
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }))
    }

    fn base_url(&self) -> Option<&str> {
        Some(&self.base_url)
    }

    fn auth_headers(&self) -> Vec<(String, String)> {
        vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        )]
    }
}
