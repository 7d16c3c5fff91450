//! Decoder for the `application/vnd.amazon.eventstream` binary framing
//!
//! `invoke-with-response-stream` responses arrive as framed messages:
//! a 12-byte prelude (total length, headers length, prelude CRC), a header
//! block, the payload, and a trailing message CRC. For Bedrock the payload
//! of a `chunk` event is `{"bytes": "<base64>"}` wrapping the model's own
//! event JSON. CRCs are not verified here; a torn frame surfaces as a parse
//! error on the inner JSON instead.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::core::types::GatewayError;

const PRELUDE_LEN: usize = 12;
const MESSAGE_CRC_LEN: usize = 4;

/// Incremental frame decoder
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
}

impl EventStreamDecoder {
    /// Fresh decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every inner event JSON completed by them.
    ///
    /// An `exception` message fails the stream with a provider error.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<Value>, GatewayError> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        loop {
            if self.buffer.len() < PRELUDE_LEN {
                break;
            }
            let total_len = u32::from_be_bytes(self.buffer[0..4].try_into().unwrap()) as usize;
            if total_len < PRELUDE_LEN + MESSAGE_CRC_LEN || self.buffer.len() < total_len {
                break;
            }
            let headers_len = u32::from_be_bytes(self.buffer[4..8].try_into().unwrap()) as usize;

            let frame: Vec<u8> = self.buffer.drain(..total_len).collect();
            let headers_end = PRELUDE_LEN + headers_len;
            let payload_end = total_len - MESSAGE_CRC_LEN;
            if headers_end > payload_end {
                return Err(GatewayError::parsing(
                    "bedrock event stream: header block overruns frame",
                ));
            }

            let headers = parse_headers(&frame[PRELUDE_LEN..headers_end]);
            let payload = &frame[headers_end..payload_end];

            if header_value(&headers, ":message-type").is_some_and(|v| v == "exception") {
                let detail = serde_json::from_slice::<Value>(payload)
                    .ok()
                    .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_else(|| String::from_utf8_lossy(payload).to_string());
                let kind = header_value(&headers, ":exception-type")
                    .unwrap_or_else(|| "exception".to_string());
                return Err(GatewayError::provider(
                    "bedrock",
                    200,
                    format!("{kind}: {detail}"),
                ));
            }

            let outer: Value = match serde_json::from_slice(payload) {
                Ok(outer) => outer,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping undecodable bedrock frame");
                    continue;
                }
            };
            let Some(encoded) = outer.get("bytes").and_then(Value::as_str) else {
                continue;
            };
            let decoded = BASE64
                .decode(encoded)
                .map_err(|err| GatewayError::parsing(format!("bedrock chunk base64: {err}")))?;
            let event: Value = serde_json::from_slice(&decoded)
                .map_err(|err| GatewayError::parsing(format!("bedrock chunk json: {err}")))?;
            events.push(event);
        }
        Ok(events)
    }
}

/// Minimal header block parse; only string-typed (7) values are retained
fn parse_headers(mut block: &[u8]) -> Vec<(String, String)> {
    let mut headers = Vec::new();
    while !block.is_empty() {
        let name_len = block[0] as usize;
        if block.len() < 1 + name_len + 1 {
            break;
        }
        let name = String::from_utf8_lossy(&block[1..1 + name_len]).to_string();
        let value_type = block[1 + name_len];
        block = &block[1 + name_len + 1..];

        match value_type {
            0 | 1 => headers.push((name, (value_type == 0).to_string())),
            2 => block = block.get(1..).unwrap_or_default(),
            3 => block = block.get(2..).unwrap_or_default(),
            4 => block = block.get(4..).unwrap_or_default(),
            5 | 8 => block = block.get(8..).unwrap_or_default(),
            6 | 7 => {
                if block.len() < 2 {
                    break;
                }
                let len = u16::from_be_bytes(block[0..2].try_into().unwrap()) as usize;
                if block.len() < 2 + len {
                    break;
                }
                if value_type == 7 {
                    let value = String::from_utf8_lossy(&block[2..2 + len]).to_string();
                    headers.push((name, value));
                }
                block = &block[2 + len..];
            }
            9 => block = block.get(16..).unwrap_or_default(),
            _ => break,
        }
    }
    headers
}

fn header_value(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(header, _)| header == name)
        .map(|(_, value)| value.clone())
}
