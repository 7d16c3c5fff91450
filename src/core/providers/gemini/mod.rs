//! Gemini adapter
//!
//! Google's REST shape: `contents` with `user`/`model` roles and text
//! `parts`, sampling in `generationConfig`, and the API key both as a
//! `?key=` query parameter and an `x-goog-api-key` header. Gemini has no
//! system role in this surface, so system messages are prepended into the
//! first user turn. Streaming goes through a sibling path with `?alt=sse`
//! carrying the same response JSON per event.

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

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";

const KNOWN_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-pro", "gemini-1.5-flash"];

/// Map Gemini's upper-case finish vocabulary
pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

/// Build the `generateContent` body: roles mapped (`assistant` → `model`),
/// system text folded into the first user turn, sampling knobs under
/// `generationConfig`.
pub(crate) fn generate_content_body(request: &ChatRequest) -> Value {
    let system = request.system_text();
    let mut system_pending = system.as_deref();

    let mut contents = Vec::new();
    for message in &request.messages {
        if message.role == MessageRole::System {
            continue;
        }
        let role = match message.role {
            MessageRole::Assistant => "model",
            _ => "user",
        };
        let mut text = message.text();
        if role == "user" {
            if let Some(system_text) = system_pending.take() {
                text = format!("{system_text}\n\n{text}");
            }
        }
        contents.push(json!({ "role": role, "parts": [{ "text": text }] }));
    }
    // All-system conversations still need one user turn
    if let Some(system_text) = system_pending {
        contents.insert(0, json!({ "role": "user", "parts": [{ "text": system_text }] }));
    }

    let mut generation_config = json!({});
    if let Some(temperature) = request.temperature {
        generation_config["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        generation_config["topP"] = json!(top_p);
    }
    if let Some(max_tokens) = request.max_tokens.or(request.max_completion_tokens) {
        generation_config["maxOutputTokens"] = json!(max_tokens);
    }
    if let Some(stop) = &request.stop {
        generation_config["stopSequences"] = json!(stop);
    }

    let mut body = json!({ "contents": contents });
    if generation_config.as_object().is_some_and(|o| !o.is_empty()) {
        body["generationConfig"] = generation_config;
    }
    body
}

/// Translate one `GenerateContentResponse` payload into the normalised
/// response. Streaming reuses this shape per event.
pub(crate) fn parse_candidates(payload: &Value) -> (String, Option<FinishReason>, Option<Usage>) {
    let text: String = payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let finish = payload
        .pointer("/candidates/0/finishReason")
        .and_then(Value::as_str)
        .map(map_finish_reason);

    let usage = payload.get("usageMetadata").map(|meta| {
        Usage::new(
            meta.get("promptTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32,
            meta.get("candidatesTokenCount").and_then(Value::as_u64).unwrap_or(0) as u32,
        )
    });

    (text, finish, usage)
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
    GatewayError::provider("gemini", status, message)
}

/// Gemini provider
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl GeminiProvider {
    /// Adapter against generativelanguage.googleapis.com
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

    fn endpoint(&self, model: &str, operation: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url, API_VERSION, model, operation
        )
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        url: String,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let send = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .header("x-goog-api-key", &self.api_key)
            .json(body);

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
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
        model_has_prefix(model, &["gemini-", "models/gemini-"])
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        let body = generate_content_body(request);
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.send(ctx, url, &[], &body).await?;

        let payload: Value = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("gemini response: {err}")))?,
        };

        let (text, finish, usage) = parse_candidates(&payload);
        Ok(ChatResponse {
            model: request.model.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: finish,
            }],
            usage,
            ..ChatResponse::default()
        }
        .tagged("gemini"))
    }

    async fn complete_stream(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChunkStream, GatewayError> {
        let body = generate_content_body(request);
        let url = self.endpoint(&request.model, "streamGenerateContent");
        let response = self.send(ctx, url, &[("alt", "sse")], &body).await?;

        let lines = data_lines(response, ctx.cancellation.clone());
        let model = request.model.clone();
        let stream_id = format!("chatcmpl-{}", uuid::Uuid::new_v4().simple());

        Ok(Box::pin(async_stream::stream! {
            futures::pin_mut!(lines);
            while let Some(item) = lines.next().await {
                match item {
                    Ok(payload) => {
                        match streaming::translate_payload(&payload, &stream_id, &model) {
                            Some(chunk) => yield Ok(chunk),
                            None => continue,
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
        vec![("x-goog-api-key".to_string(), self.api_key.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_role_becomes_model() {
        let request = ChatRequest::new("gemini-1.5-pro")
            .user("Hi")
            .assistant("Hello");
        let body = generate_content_body(&request);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn system_prepended_into_first_user_turn() {
        let request = ChatRequest::new("gemini-1.5-pro")
            .system("Be brief.")
            .user("Explain monads");
        let body = generate_content_body(&request);
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(
            contents[0]["parts"][0]["text"],
            "Be brief.\n\nExplain monads"
        );
    }

    #[test]
    fn generation_config_carries_sampling() {
        let request = ChatRequest::new("gemini-1.5-pro")
            .user("Hi")
            .with_temperature(0.3)
            .with_max_tokens(128);
        let body = generate_content_body(&request);
        assert_eq!(body["generationConfig"]["temperature"], 0.3);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 128);
    }

    #[test]
    fn finish_reason_mapping() {
        assert_eq!(map_finish_reason("STOP"), FinishReason::Stop);
        assert_eq!(map_finish_reason("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(map_finish_reason("SAFETY"), FinishReason::ContentFilter);
        assert_eq!(
            map_finish_reason("OTHER"),
            FinishReason::Other("OTHER".to_string())
        );
    }
}
