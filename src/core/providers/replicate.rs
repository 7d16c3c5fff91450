//! Replicate adapter
//!
//! Replicate runs predictions asynchronously: a POST creates the prediction
//! (with a `Prefer: wait` hint so fast models return synchronously), and
//! anything still running is polled at a fixed cadence until it reaches a
//! terminal status or the caller cancels. Output is either one string or an
//! array of string tokens concatenated in order. Image generation follows
//! the same submit-then-poll flow with result URLs returned verbatim.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::base::{trim_base_url, AuthScheme};
use crate::core::traits::{Capability, Provider};
use crate::core::types::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, FinishReason, GatewayError, ImageData,
    ImageRequest, ImageResponse, RequestContext,
};

const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Poll cadence for in-flight predictions; an implementation parameter, not
/// a contract
const POLL_INTERVAL: Duration = Duration::from_millis(500);

const KNOWN_MODELS: &[&str] = &[
    "meta/meta-llama-3-70b-instruct",
    "meta/meta-llama-3-8b-instruct",
    "stability-ai/sdxl",
];

/// Flatten a prediction output: a bare string, or an array of string tokens
/// joined in order
fn flatten_output(output: Option<&Value>) -> String {
    match output {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(tokens)) => tokens
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .concat(),
        _ => String::new(),
    }
}

/// Replicate provider
pub struct ReplicateProvider {
    auth: AuthScheme,
    base_url: String,
    http: reqwest::Client,
}

impl ReplicateProvider {
    /// Adapter against api.replicate.com
    pub fn new(api_token: impl Into<String>) -> Self {
        Self::with_base_url(api_token, DEFAULT_BASE_URL)
    }

    /// Adapter against an alternative endpoint
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            auth: AuthScheme::Token(api_token.into()),
            base_url: trim_base_url(base_url),
            http: reqwest::Client::new(),
        }
    }

    async fn create_prediction(
        &self,
        ctx: &RequestContext,
        model: &str,
        input: Value,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}/v1/models/{}/predictions", self.base_url, model);
        let send = self
            .auth
            .apply(self.http.post(&url))
            .header("Prefer", "wait")
            .json(&json!({ "input": input }));

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            response = send.send() => response?,
        };
        self.read_prediction(ctx, response).await
    }

    async fn get_prediction(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Value, GatewayError> {
        let url = format!("{}/v1/predictions/{id}", self.base_url);
        let send = self.auth.apply(self.http.get(&url));

        let response = tokio::select! {
            _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
            response = send.send() => response?,
        };
        self.read_prediction(ctx, response).await
    }

    async fn read_prediction(
        &self,
        ctx: &RequestContext,
        response: reqwest::Response,
    ) -> Result<Value, GatewayError> {
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
                        .get("detail")
                        .or_else(|| value.get("title"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or(body);
            return Err(GatewayError::provider("replicate", status.as_u16(), message));
        }
        tokio::select! {
            _ = ctx.cancellation.cancelled() => Err(GatewayError::Cancelled),
            payload = response.json() => payload
                .map_err(|err| GatewayError::parsing(format!("replicate prediction: {err}"))),
        }
    }

    /// Drive a prediction to a terminal status, polling while it runs.
    ///
    /// The interval is dropped on every exit path; cancellation
    /// short-circuits between polls.
    async fn await_prediction(
        &self,
        ctx: &RequestContext,
        mut prediction: Value,
    ) -> Result<Value, GatewayError> {
        let id = prediction
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::parsing("replicate prediction without id"))?
            .to_string();

        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        // The first tick fires immediately; consume it so the loop waits
        ticker.tick().await;

        loop {
            let status = prediction
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            match status {
                "succeeded" => return Ok(prediction),
                "failed" | "canceled" => {
                    let detail = prediction
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or(status);
                    return Err(GatewayError::provider(
                        "replicate",
                        200,
                        format!("prediction {status}: {detail}"),
                    ));
                }
                _ => {
                    tokio::select! {
                        _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
                        _ = ticker.tick() => {}
                    }
                    prediction = self.get_prediction(ctx, &id).await?;
                }
            }
        }
    }
}

#[async_trait]
impl Provider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Completion, Capability::ImageGeneration]
    }

    fn supported_models(&self) -> Vec<String> {
        KNOWN_MODELS.iter().map(|m| m.to_string()).collect()
    }

    // Replicate models are `owner/name` pairs
    fn supports_model(&self, model: &str) -> bool {
        model.contains('/')
    }

    async fn complete(
        &self,
        ctx: &RequestContext,
        request: &ChatRequest,
    ) -> Result<ChatResponse, GatewayError> {
        // Prompt-only upstream: the transcript is flattened in order
        let prompt = request
            .messages
            .iter()
            .map(|message| message.text())
            .collect::<Vec<_>>()
            .join("\n");

        let mut input = json!({ "prompt": prompt });
        if let Some(max_tokens) = request.max_tokens {
            input["max_tokens"] = json!(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            input["temperature"] = json!(temperature);
        }
        if let Some(top_p) = request.top_p {
            input["top_p"] = json!(top_p);
        }

        let created = self.create_prediction(ctx, &request.model, input).await?;
        let finished = self.await_prediction(ctx, created).await?;

        let text = flatten_output(finished.get("output"));
        Ok(ChatResponse {
            id: finished
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            model: request.model.clone(),
            choices: vec![ChatChoice {
                index: 0,
                message: ChatMessage::assistant(text),
                finish_reason: Some(FinishReason::Stop),
            }],
            usage: None,
            ..ChatResponse::default()
        }
        .tagged("replicate"))
    }

    async fn generate_image(
        &self,
        ctx: &RequestContext,
        request: &ImageRequest,
    ) -> Result<ImageResponse, GatewayError> {
        let mut input = json!({ "prompt": request.prompt });
        if let Some(n) = request.n {
            input["num_outputs"] = json!(n);
        }

        let created = self.create_prediction(ctx, &request.model, input).await?;
        let finished = self.await_prediction(ctx, created).await?;

        // Result URLs pass through untouched
        let data: Vec<ImageData> = match finished.get("output") {
            Some(Value::String(url)) => vec![ImageData {
                url: Some(url.clone()),
                b64_json: None,
                revised_prompt: None,
            }],
            Some(Value::Array(urls)) => urls
                .iter()
                .filter_map(Value::as_str)
                .map(|url| ImageData {
                    url: Some(url.to_string()),
                    b64_json: None,
                    revised_prompt: None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Ok(ImageResponse {
            created: chrono::Utc::now().timestamp(),
            data,
            provider: Some("replicate".to_string()),
        })
    }
}
