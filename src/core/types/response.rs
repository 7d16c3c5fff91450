//! Normalised chat completion response types

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::message::{ChatMessage, MessageContent};

/// Why a choice stopped generating, after provider-specific mapping.
///
/// Upstream vocabularies that do not map onto the canonical set are carried
/// through verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural stop or stop sequence hit
    Stop,
    /// Output token cap reached
    Length,
    /// The model emitted tool calls
    ToolCalls,
    /// Upstream safety filter intervened
    ContentFilter,
    /// Provider-specific reason preserved as-is
    Other(String),
}

impl FinishReason {
    /// Canonical wire spelling
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(raw) => raw,
        }
    }

    /// Parse a wire spelling; unknown values are preserved in `Other`
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FinishReason::parse(&raw))
    }
}

/// Token accounting for one completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// Completion tokens
    pub completion_tokens: u32,
    /// Always `prompt + completion` when the adapter sets both
    pub total_tokens: u32,
    /// Reasoning tokens, where the upstream reports them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u32>,
    /// Prompt tokens served from provider-side cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_tokens: Option<u32>,
    /// Prompt tokens written to provider-side cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_write_tokens: Option<u32>,
}

impl Usage {
    /// Build with the total derived from the parts
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            reasoning_tokens: None,
            cache_read_tokens: None,
            cache_write_tokens: None,
        }
    }
}

/// One generated alternative
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Position within `choices`
    pub index: u32,
    /// The generated message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Normalised chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Upstream response id, or a synthetic one when the upstream has none
    pub id: String,
    /// Object tag, `"chat.completion"`
    #[serde(default = "default_completion_object")]
    pub object: String,
    /// Unix creation timestamp
    #[serde(default)]
    pub created: i64,
    /// Model that produced the completion
    pub model: String,
    /// Which adapter produced this response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Generated alternatives, ordered by index
    pub choices: Vec<ChatChoice>,
    /// Token accounting, when the upstream reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

fn default_completion_object() -> String {
    "chat.completion".to_string()
}

impl ChatResponse {
    /// Text of the first choice, when it is plain text
    pub fn first_text(&self) -> Option<String> {
        self.choices.first().and_then(|choice| {
            choice.message.content.as_ref().map(MessageContent::text)
        })
    }

    /// Tag the response with the adapter that produced it
    pub fn tagged(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }
}

impl Default for ChatResponse {
    fn default() -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            object: default_completion_object(),
            created: chrono::Utc::now().timestamp(),
            model: String::new(),
            provider: None,
            choices: Vec::new(),
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_total_is_sum_of_parts() {
        let usage = Usage::new(5, 2);
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn finish_reason_round_trip() {
        for raw in ["stop", "length", "tool_calls", "content_filter", "COMPLETE"] {
            let reason = FinishReason::parse(raw);
            assert_eq!(reason.as_str(), raw);
            let json = serde_json::to_string(&reason).unwrap();
            let back: FinishReason = serde_json::from_str(&json).unwrap();
            assert_eq!(back, reason);
        }
    }

    #[test]
    fn unknown_finish_reason_preserved() {
        assert_eq!(
            FinishReason::parse("SAFETY"),
            FinishReason::Other("SAFETY".to_string())
        );
    }

    #[test]
    fn response_parses_openai_wire_shape() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1736900000,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.id, "chatcmpl-1");
        assert_eq!(response.first_text().unwrap(), "Hello!");
        assert_eq!(response.usage.as_ref().unwrap().total_tokens, 7);
        assert_eq!(
            response.choices[0].finish_reason,
            Some(FinishReason::Stop)
        );
    }
}
