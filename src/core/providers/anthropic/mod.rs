//! Anthropic adapter
//!
//! Speaks the `/v1/messages` schema rather than Chat Completions: system
//! messages merge into a top-level `system` string, `max_tokens` is
//! mandatory (defaulted when the caller set none), and response content is a
//! list of typed blocks whose text is concatenated. Streaming is typed SSE
//! events handled in [`streaming`].

pub mod streaming;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use super::base::sse::data_lines;
use super::base::trim_base_url;
use crate::core::traits::provider::model_has_prefix;
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, ChunkStream, FinishReason, GatewayError,
    MessageRole, RequestContext, Usage,
};

use streaming::{AnthropicEventState, Applied};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// `anthropic-version` header value
pub const API_VERSION: &str = "2023-06-01";

/// Applied when the caller set no output cap; the endpoint requires one
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const KNOWN_MODELS: &[&str] = &[
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-haiku-20240307",
];

/// Map a `stop_reason` onto the normalised vocabulary
pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Build the `/v1/messages` body shared with Anthropic-on-Bedrock: messages
/// with system turns hoisted out, the mandatory `max_tokens`, and the
/// optional sampling knobs. Callers add `model`/`stream`/`anthropic_version`
/// as their endpoint requires.
pub(crate) fn messages_body(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|message| message.role != MessageRole::System)
        .map(|message| {
            let role = match message.role {
                MessageRole::Assistant => "assistant",
                // Tool results ride along as user turns; Anthropic has no
                // standalone tool role in this mapping
                _ => "user",
            };
            json!({ "role": role, "content": message.text() })
        })
        .collect();

    let mut body = json!({
        "messages": messages,
        "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    });
    if let Some(system) = request.system_text() {
        body["system"] = json!(system);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        body["top_p"] = json!(top_p);
    }
    if let Some(stop) = &request.stop {
        body["stop_sequences"] = json!(stop);
    }
    body
}

fn parse_error(status: u16, body: &str) -> GatewayError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    GatewayError::provider("anthropic", status, message)
}

/// Anthropic provider
pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl AnthropicProvider {
    /// Adapter against api.anthropic.com
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

    async fn send_messages(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let mut body = messages_body(request);
        body["model"] = json!(request.model);
        if stream {
            body["stream"] = json!(true);
        }

        let send = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
            return Err(parse_error(status.as_u16(), &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
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
        model_has_prefix(model, &["claude-"])
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let response = self.send_messages(ctx, request, false).await?;
        let payload: Value = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("anthropic response: {err}")))?,
        };

        // Text blocks concatenated in order; non-text blocks are dropped
        let text: String = payload
            .get("content")
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
            .get("stop_reason")
            .and_then(Value::as_str)
            .map(map_stop_reason);

        let usage = payload.get("usage").map(|usage| {
            let mut out = Usage::new(
                usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
                usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            );
            out.cache_read_tokens = usage
                .get("cache_read_input_tokens")
                .and_then(Value::as_u64)
                .map(|v| v as u32);
            out.cache_write_tokens = usage
                .get("cache_creation_input_tokens")
                .and_then(Value::as_u64)
                .map(|v| v as u32);
            out
        });

        Ok(ChatResponse {
            id: payload
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            model: payload
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&request.model)
                .to_string(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: finish,
            }],
            usage,
            ..ChatResponse::default()
        }
        .tagged("anthropic"))
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let response = self.send_messages(ctx, request, true).await?;
        let lines = data_lines(response, ctx.cancellation.clone());
        let fallback_model = request.model.clone();

        Ok(Box::pin(async_stream::stream! {
            futures::pin_mut!(lines);
            let mut state = AnthropicEventState::new(fallback_model);
            while let Some(item) = lines.next().await {
                match item {
                    Ok(payload) => {
                        let event: Value = match serde_json::from_str(&payload) {
                            Ok(event) => event,
                            Err(err) => {
                                tracing::debug!(error = %err, "skipping malformed anthropic event");
                                continue;
                            }
                        };
                        match state.apply(&event) {
                            Ok(Applied::Chunk(chunk)) => yield Ok(chunk),
                            Ok(Applied::Skip) => {}
                            Ok(Applied::Done) => break,
                            Err(err) => {
                                yield Err(err);
                                break;
                            }
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
        vec![
            ("x-api-key".to_string(), self.api_key.clone()),
            ("anthropic-version".to_string(), API_VERSION.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_hoisted_to_top_level() {
        let request = ChatRequest::new("claude-3-haiku-20240307")
            .system("Be terse.")
            .user("Hi")
            .system("Always answer in French.");
        let body = messages_body(&request);
        assert_eq!(body["system"], "Be terse.\nAlways answer in French.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn max_tokens_defaulted_when_absent() {
        let request = ChatRequest::new("claude-3-haiku-20240307").user("Hi");
        let body = messages_body(&request);
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);

        let capped = request.with_max_tokens(64);
        assert_eq!(messages_body(&capped)["max_tokens"], 64);
    }

    #[test]
    fn stop_reason_mapping() {
        assert_eq!(map_stop_reason("end_turn"), FinishReason::Stop);
        assert_eq!(map_stop_reason("stop_sequence"), FinishReason::Stop);
        assert_eq!(map_stop_reason("max_tokens"), FinishReason::Length);
        assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolCalls);
        assert_eq!(
            map_stop_reason("refusal"),
            FinishReason::Other("refusal".to_string())
        );
    }

    #[test]
    fn model_predicate() {
        let provider = AnthropicProvider::new("key");
        for model in provider.supported_models() {
            assert!(provider.supports_model(&model));
        }
        assert!(!provider.supports_model("gpt-4o"));
    }
}
