//! Streamed `GenerateContentResponse` translation
//!
//! Gemini's SSE stream carries full response objects per event; each one
//! becomes a chunk with the candidate's text as the content delta.

use serde_json::Value;

use super::parse_candidates;
use crate::core::types::{ChatChunk, ChatDelta, ChatStreamChoice};

/// Translate one SSE payload into a chunk. Malformed payloads are skipped
/// (`None`), keeping the stream alive.
pub(crate) fn translate_payload(payload: &str, stream_id: &str, model: &str) -> Option<ChatChunk> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "skipping malformed gemini event");
            return None;
        }
    };

    let (text, finish, usage) = parse_candidates(&value);

    Some(ChatChunk {
        id: stream_id.to_string(),
        object: "chat.completion.chunk".to_string(),
        created: chrono::Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![ChatStreamChoice {
            index: 0,
            delta: ChatDelta {
                role: None,
                content: if text.is_empty() { None } else { Some(text) },
                tool_calls: None,
            },
            finish_reason: finish,
        }],
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FinishReason;

    #[test]
    fn payload_with_text_becomes_content_delta() {
        let payload = r#"{"candidates": [{"content": {"parts": [{"text": "Hel"}], "role": "model"}}]}"#;
        let chunk = translate_payload(payload, "id-1", "gemini-1.5-pro").unwrap();
        assert_eq!(chunk.first_content(), Some("Hel"));
        assert!(chunk.choices[0].finish_reason.is_none());
    }

    #[test]
    fn terminal_payload_carries_finish_and_usage() {
        let payload = r#"{
            "candidates": [{"content": {"parts": [{"text": ""}]}, "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 9, "totalTokenCount": 13}
        }"#;
        let chunk = translate_payload(payload, "id-1", "gemini-1.5-pro").unwrap();
        assert_eq!(chunk.choices[0].finish_reason, Some(FinishReason::Stop));
        assert_eq!(chunk.usage.as_ref().unwrap().total_tokens, 13);
    }

    #[test]
    fn malformed_payload_skipped() {
        assert!(translate_payload("not json", "id", "m").is_none());
    }
}
