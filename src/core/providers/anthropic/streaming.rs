//! Translation of Anthropic's typed streaming events
//!
//! The `/v1/messages` stream is a sequence of typed events rather than
//! ready-made chunks: `message_start` carries the id and model,
//! `content_block_delta` the text increments, `message_delta` the stop
//! reason and usage, and `message_stop` closes the stream. The same event
//! vocabulary arrives from Anthropic-on-Bedrock, so the state machine here
//! is shared with the Bedrock adapter.

use serde_json::Value;

use super::map_stop_reason;
use crate::core::types::{ChatChunk, FinishReason, GatewayError, Usage};

/// Result of applying one event
#[derive(Debug)]
pub enum Applied {
    /// Forward this chunk
    Chunk(ChatChunk),
    /// Event consumed, nothing to forward
    Skip,
    /// `message_stop` seen; close the stream
    Done,
}

/// Per-stream state: id and model captured from `message_start`
#[derive(Debug)]
pub struct AnthropicEventState {
    id: String,
    model: String,
}

impl AnthropicEventState {
    /// Fresh state; `fallback_model` is used until `message_start` reports
    /// the authoritative one
    pub fn new(fallback_model: String) -> Self {
        Self {
            id: String::new(),
            model: fallback_model,
        }
    }

    /// Apply one decoded event
    pub fn apply(&mut self, event: &Value) -> Result<Applied, GatewayError> {
        match event.get("type").and_then(Value::as_str).unwrap_or("") {
            "message_start" => {
                if let Some(id) = event.pointer("/message/id").and_then(Value::as_str) {
                    self.id = id.to_string();
                }
                if let Some(model) = event.pointer("/message/model").and_then(Value::as_str) {
                    self.model = model.to_string();
                }
                Ok(Applied::Chunk(ChatChunk::role(&self.id, &self.model)))
            }

            "content_block_delta" => {
                let text = event
                    .pointer("/delta/text")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                Ok(Applied::Chunk(ChatChunk::content(
                    &self.id,
                    &self.model,
                    text,
                )))
            }

            "message_delta" => {
                let finish = event
                    .pointer("/delta/stop_reason")
                    .and_then(Value::as_str)
                    .map(map_stop_reason)
                    .unwrap_or(FinishReason::Stop);
                let usage = event.get("usage").map(|usage| {
                    Usage::new(
                        usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
                        usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0) as u32,
                    )
                });
                Ok(Applied::Chunk(ChatChunk::finish(
                    &self.id,
                    &self.model,
                    finish,
                    usage,
                )))
            }

            "message_stop" => Ok(Applied::Done),

            "error" => {
                let message = event
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown streaming error");
                Err(GatewayError::provider("anthropic", 200, message))
            }

            // ping, content_block_start, content_block_stop, unknown
            _ => Ok(Applied::Skip),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chunk(applied: Applied) -> ChatChunk {
        match applied {
            Applied::Chunk(chunk) => chunk,
            other => panic!("expected chunk, got {:?}", other),
        }
    }

    #[test]
    fn full_event_sequence_translates_in_order() {
        let mut state = AnthropicEventState::new("claude-3-haiku".to_string());

        let start = chunk(
            state
                .apply(&json!({
                    "type": "message_start",
                    "message": {"id": "msg_123", "model": "claude-3-haiku-20240307"}
                }))
                .unwrap(),
        );
        assert_eq!(start.id, "msg_123");
        assert_eq!(start.model, "claude-3-haiku-20240307");
        assert!(start.choices[0].delta.role.is_some());

        let hello = chunk(
            state
                .apply(&json!({
                    "type": "content_block_delta",
                    "delta": {"type": "text_delta", "text": "Hello"}
                }))
                .unwrap(),
        );
        assert_eq!(hello.first_content(), Some("Hello"));

        let world = chunk(
            state
                .apply(&json!({
                    "type": "content_block_delta",
                    "delta": {"type": "text_delta", "text": " world"}
                }))
                .unwrap(),
        );
        assert_eq!(world.first_content(), Some(" world"));

        let finish = chunk(
            state
                .apply(&json!({
                    "type": "message_delta",
                    "delta": {"stop_reason": "end_turn"},
                    "usage": {"input_tokens": 10, "output_tokens": 2}
                }))
                .unwrap(),
        );
        assert_eq!(finish.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(finish.usage.as_ref().unwrap().total_tokens, 12);

        assert!(matches!(
            state.apply(&json!({"type": "message_stop"})).unwrap(),
            Applied::Done
        ));
    }

    #[test]
    fn ping_and_block_boundaries_are_skipped() {
        let mut state = AnthropicEventState::new("m".to_string());
        for event_type in ["ping", "content_block_start", "content_block_stop", "wat"] {
            assert!(matches!(
                state.apply(&json!({"type": event_type})).unwrap(),
                Applied::Skip
            ));
        }
    }

    #[test]
    fn error_event_fails_the_stream() {
        let mut state = AnthropicEventState::new("m".to_string());
        let err = state
            .apply(&json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            }))
            .unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn max_tokens_maps_to_length() {
        let mut state = AnthropicEventState::new("m".to_string());
        let finish = chunk(
            state
                .apply(&json!({
                    "type": "message_delta",
                    "delta": {"stop_reason": "max_tokens"}
                }))
                .unwrap(),
        );
        assert_eq!(finish.choices[0].finish_reason, Some(FinishReason::Length));
    }
}
