//! Per-family request/response transformations for Bedrock
//!
//! Bedrock hosts several model families behind one `invoke` surface, each
//! keeping its native schema. The family is the model-id prefix before the
//! first dot: `anthropic.` uses the messages schema, `amazon.` Titan takes a
//! flattened `inputText`, `meta.` Llama takes a single framed prompt.

use serde_json::{json, Value};

use super::super::anthropic;
use crate::core::types::{ChatRequest, FinishReason, GatewayError, MessageRole, Usage};

/// Model family resolved from the id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// `anthropic.*` — messages schema
    Anthropic,
    /// `amazon.*` — Titan text
    Titan,
    /// `meta.*` — Llama prompt format
    Llama,
}

impl ModelFamily {
    /// Resolve from a Bedrock model id
    pub fn of(model: &str) -> Result<Self, GatewayError> {
        match model.split('.').next().unwrap_or("") {
            "anthropic" => Ok(ModelFamily::Anthropic),
            "amazon" => Ok(ModelFamily::Titan),
            "meta" => Ok(ModelFamily::Llama),
            other => Err(GatewayError::unsupported(
                "bedrock",
                format!("model family '{other}'"),
            )),
        }
    }
}

/// Anthropic-on-Bedrock pins its own schema version
pub const ANTHROPIC_BEDROCK_VERSION: &str = "bedrock-2023-05-31";

/// Build the invoke body for the model's family
pub fn build_body(family: ModelFamily, request: &ChatRequest) -> Value {
    match family {
        ModelFamily::Anthropic => {
            let mut body = anthropic::messages_body(request);
            body["anthropic_version"] = json!(ANTHROPIC_BEDROCK_VERSION);
            body
        }
        ModelFamily::Titan => titan_body(request),
        ModelFamily::Llama => llama_body(request),
    }
}

/// Parse the invoke response for the model's family into
/// `(text, finish_reason, usage)`
pub fn parse_body(
    family: ModelFamily,
    payload: &Value,
) -> (String, Option<FinishReason>, Option<Usage>) {
    match family {
        ModelFamily::Anthropic => parse_anthropic(payload),
        ModelFamily::Titan => parse_titan(payload),
        ModelFamily::Llama => parse_llama(payload),
    }
}

fn titan_body(request: &ChatRequest) -> Value {
    // Titan takes one flat transcript; roles become line prefixes and the
    // trailing "Bot:" invites the completion
    let mut input = String::new();
    if let Some(system) = request.system_text() {
        input.push_str(&system);
        input.push_str("\n\n");
    }
    for message in &request.messages {
        match message.role {
            MessageRole::System => continue,
            MessageRole::Assistant => {
                input.push_str("Bot: ");
            }
            _ => {
                input.push_str("User: ");
            }
        }
        input.push_str(&message.text());
        input.push('\n');
    }
    input.push_str("Bot:");

    let mut config = json!({});
    if let Some(max_tokens) = request.max_tokens {
        config["maxTokenCount"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        config["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        config["topP"] = json!(top_p);
    }
    if let Some(stop) = &request.stop {
        config["stopSequences"] = json!(stop);
    }

    let mut body = json!({ "inputText": input });
    if config.as_object().is_some_and(|o| !o.is_empty()) {
        body["textGenerationConfig"] = config;
    }
    body
}

fn llama_body(request: &ChatRequest) -> Value {
    // Llama 3 instruct framing with explicit special tokens
    let mut prompt = String::from("<|begin_of_text|>");
    if let Some(system) = request.system_text() {
        prompt.push_str("<|start_header_id|>system<|end_header_id|>\n\n");
        prompt.push_str(&system);
        prompt.push_str("<|eot_id|>");
    }
    for message in &request.messages {
        let header = match message.role {
            MessageRole::System => continue,
            MessageRole::Assistant => "assistant",
            _ => "user",
        };
        prompt.push_str(&format!("<|start_header_id|>{header}<|end_header_id|>\n\n"));
        prompt.push_str(&message.text());
        prompt.push_str("<|eot_id|>");
    }
    prompt.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");

    let mut body = json!({ "prompt": prompt });
    if let Some(max_tokens) = request.max_tokens {
        body["max_gen_len"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(top_p) = request.top_p {
        body["top_p"] = json!(top_p);
    }
    body
}

fn parse_anthropic(payload: &Value) -> (String, Option<FinishReason>, Option<Usage>) {
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
        .map(anthropic::map_stop_reason);
    let usage = payload.get("usage").map(|usage| {
        Usage::new(
            usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
            usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
        )
    });
    (text, finish, usage)
}

fn parse_titan(payload: &Value) -> (String, Option<FinishReason>, Option<Usage>) {
    let text = payload
        .pointer("/results/0/outputText")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let finish = payload
        .pointer("/results/0/completionReason")
        .and_then(Value::as_str)
        .map(|reason| match reason {
            "FINISH" => FinishReason::Stop,
            "LENGTH" => FinishReason::Length,
            "CONTENT_FILTERED" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        });
    let prompt_tokens = payload
        .get("inputTextTokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let completion_tokens = payload
        .pointer("/results/0/tokenCount")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let usage = (prompt_tokens + completion_tokens > 0)
        .then(|| Usage::new(prompt_tokens, completion_tokens));
    (text, finish, usage)
}

fn parse_llama(payload: &Value) -> (String, Option<FinishReason>, Option<Usage>) {
    let text = payload
        .get("generation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let finish = payload
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(FinishReason::parse);
    let prompt_tokens = payload
        .get("prompt_token_count")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let completion_tokens = payload
        .get("generation_token_count")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let usage = (prompt_tokens + completion_tokens > 0)
        .then(|| Usage::new(prompt_tokens, completion_tokens));
    (text, finish, usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_resolution() {
        assert_eq!(
            ModelFamily::of("anthropic.claude-3-haiku-20240307-v1:0").unwrap(),
            ModelFamily::Anthropic
        );
        assert_eq!(
            ModelFamily::of("amazon.titan-text-express-v1").unwrap(),
            ModelFamily::Titan
        );
        assert_eq!(
            ModelFamily::of("meta.llama3-70b-instruct-v1:0").unwrap(),
            ModelFamily::Llama
        );
        assert!(ModelFamily::of("cohere.command-text-v14").is_err());
    }

    #[test]
    fn anthropic_body_pins_bedrock_version() {
        let request = ChatRequest::new("anthropic.claude-3-haiku-20240307-v1:0").user("Hi");
        let body = build_body(ModelFamily::Anthropic, &request);
        assert_eq!(body["anthropic_version"], ANTHROPIC_BEDROCK_VERSION);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn titan_flattens_messages_into_input_text() {
        let request = ChatRequest::new("amazon.titan-text-express-v1")
            .system("Be kind.")
            .user("Hello")
            .with_max_tokens(100);
        let body = build_body(ModelFamily::Titan, &request);
        let input = body["inputText"].as_str().unwrap();
        assert!(input.starts_with("Be kind.\n\n"));
        assert!(input.contains("User: Hello\n"));
        assert!(input.ends_with("Bot:"));
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 100);
    }

    #[test]
    fn llama_prompt_uses_special_token_framing() {
        let request = ChatRequest::new("meta.llama3-70b-instruct-v1:0")
            .system("sys")
            .user("hi");
        let body = build_body(ModelFamily::Llama, &request);
        let prompt = body["prompt"].as_str().unwrap();
        assert!(prompt.starts_with("<|begin_of_text|><|start_header_id|>system<|end_header_id|>"));
        assert!(prompt.contains("<|start_header_id|>user<|end_header_id|>\n\nhi<|eot_id|>"));
        assert!(prompt.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn titan_response_parses() {
        let payload = serde_json::json!({
            "inputTextTokenCount": 7,
            "results": [{
                "tokenCount": 3,
                "outputText": " Hi there",
                "completionReason": "FINISH"
            }]
        });
        let (text, finish, usage) = parse_body(ModelFamily::Titan, &payload);
        assert_eq!(text, " Hi there");
        assert_eq!(finish, Some(FinishReason::Stop));
        assert_eq!(usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn llama_response_parses() {
        let payload = serde_json::json!({
            "generation": "Hello!",
            "prompt_token_count": 5,
            "generation_token_count": 2,
            "stop_reason": "stop"
        });
        let (text, finish, usage) = parse_body(ModelFamily::Llama, &payload);
        assert_eq!(text, "Hello!");
        assert_eq!(finish, Some(FinishReason::Stop));
        assert_eq!(usage.unwrap().total_tokens, 7);
    }
}
