//! Streaming chunk types
//!
//! A streamed completion is a `Stream` of `Result<ChatChunk, GatewayError>`.
//! An `Err` item is terminal: adapters yield it last and then close the
//! stream. Dropping the consumer drops the producer with it, which is how
//! back-pressure and cancellation propagate.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use super::errors::GatewayError;
use super::message::MessageRole;
use super::response::{FinishReason, Usage};
use super::tools::FunctionCall;

/// Boxed chunk stream handed to the caller
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk, GatewayError>> + Send>>;

/// Incremental frame of a streamed completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Stream id, stable across all frames of one completion
    #[serde(default)]
    pub id: String,
    /// Object tag, `"chat.completion.chunk"`
    #[serde(default = "default_chunk_object")]
    pub object: String,
    /// Unix creation timestamp
    #[serde(default)]
    pub created: i64,
    /// Model producing the stream
    #[serde(default)]
    pub model: String,
    /// Per-choice deltas
    pub choices: Vec<ChatStreamChoice>,
    /// Usage, usually only on the final frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

fn default_chunk_object() -> String {
    "chat.completion.chunk".to_string()
}

impl ChatChunk {
    /// Frame carrying a content delta for choice 0
    pub fn content(id: impl Into<String>, model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: default_chunk_object(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatStreamChoice {
                index: 0,
                delta: ChatDelta {
                    role: None,
                    content: Some(text.into()),
                    tool_calls: None,
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// Frame opening the stream with the assistant role
    pub fn role(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: default_chunk_object(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatStreamChoice {
                index: 0,
                delta: ChatDelta {
                    role: Some(MessageRole::Assistant),
                    content: None,
                    tool_calls: None,
                },
                finish_reason: None,
            }],
            usage: None,
        }
    }

    /// Terminal frame carrying a finish reason and optional usage
    pub fn finish(
        id: impl Into<String>,
        model: impl Into<String>,
        finish_reason: FinishReason,
        usage: Option<Usage>,
    ) -> Self {
        Self {
            id: id.into(),
            object: default_chunk_object(),
            created: chrono::Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChatStreamChoice {
                index: 0,
                delta: ChatDelta {
                    role: None,
                    content: None,
                    tool_calls: None,
                },
                finish_reason: Some(finish_reason),
            }],
            usage,
        }
    }

    /// Content delta of choice 0, if any
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}

/// Delta of one choice within a chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Incremental payload
    pub delta: ChatDelta,
    /// Set on the terminal frame of the choice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDelta {
    /// Role, first frame only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<MessageRole>,
    /// Content fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Tool call fragments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of a tool call under construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position in the message's tool call list
    #[serde(default)]
    pub index: u32,
    /// Call id, first fragment only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `"function"`, first fragment only
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Name/argument fragments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

/// Name and argument fragments of a streamed function call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    /// Function name, first fragment only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Argument string fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

impl From<FunctionCall> for FunctionCallDelta {
    fn from(call: FunctionCall) -> Self {
        Self {
            name: Some(call.name),
            arguments: Some(call.arguments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_parses_openai_wire_shape() {
        let json = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "created": 1736900000,
            "model": "gpt-4o",
            "choices": [{"index": 0, "delta": {"content": "Hel"}, "finish_reason": null}]
        }"#;
        let chunk: ChatChunk = serde_json::from_str(json).unwrap();
        assert_eq!(chunk.first_content(), Some("Hel"));
        assert!(chunk.usage.is_none());
    }

    #[test]
    fn finish_chunk_carries_reason() {
        let chunk = ChatChunk::finish("id", "m", FinishReason::Stop, Some(Usage::new(1, 2)));
        assert_eq!(chunk.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(chunk.usage.as_ref().unwrap().total_tokens, 3);
    }

    #[test]
    fn delta_omits_absent_fields() {
        let chunk = ChatChunk::content("id", "m", "hi");
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json["choices"][0]["delta"].get("role").is_none());
        assert!(json["choices"][0]["delta"].get("tool_calls").is_none());
    }
}
