//! Server-sent-events scanning shared by all streaming adapters
//!
//! The transport is line-delimited UTF-8: payload lines start with the
//! literal `data: ` prefix, an empty line separates events, and the sentinel
//! `[DONE]` marks logical end of stream. Adapters layer their own JSON
//! translation on top of the raw data lines produced here.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::core::types::GatewayError;

/// End-of-stream sentinel used by OpenAI-shaped upstreams
pub const DONE_SENTINEL: &str = "[DONE]";

/// One scanned SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` line, prefix stripped
    Data(String),
    /// The `[DONE]` sentinel was seen
    Done,
}

/// Incremental scanner turning a byte feed into `data:` payloads.
///
/// Buffers partial lines across network reads; everything that is not a
/// data line (`event:`, `id:`, comments, blank separators) is dropped here
/// since the upstreams we speak tag their payloads inside the JSON itself.
#[derive(Debug, Default)]
pub struct SseScanner {
    buffer: String,
}

impl SseScanner {
    /// Fresh scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes, returning every complete frame they finish
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some(payload) = line.strip_prefix("data:") {
                let payload = payload.trim();
                if payload == DONE_SENTINEL {
                    frames.push(SseFrame::Done);
                } else if !payload.is_empty() {
                    frames.push(SseFrame::Data(payload.to_string()));
                }
            }
        }
        frames
    }
}

/// Turn a streaming HTTP response into a stream of `data:` payloads.
///
/// Terminates on the `[DONE]` sentinel, on clean EOF, on cancellation, or on
/// a read error (yielded as a final `Err` item). Dropping the returned
/// stream drops the underlying connection, so an abandoned consumer stops
/// the producer promptly.
pub fn data_lines(
    response: reqwest::Response,
    cancellation: CancellationToken,
) -> impl Stream<Item = Result<String, GatewayError>> + Send {
    async_stream::stream! {
        let body = response.bytes_stream();
        futures::pin_mut!(body);
        let mut scanner = SseScanner::new();

        'read: loop {
            let next = tokio::select! {
                biased;
                _ = cancellation.cancelled() => break 'read,
                next = body.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    for frame in scanner.push(&bytes) {
                        // Also between frames: one network read may carry
                        // many buffered events
                        if cancellation.is_cancelled() {
                            break 'read;
                        }
                        match frame {
                            SseFrame::Data(payload) => yield Ok(payload),
                            SseFrame::Done => break 'read,
                        }
                    }
                }
                Some(Err(err)) => {
                    yield Err(GatewayError::network(format!("stream read error: {err}")));
                    break 'read;
                }
                None => break 'read,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_data_lines() {
        let mut scanner = SseScanner::new();
        let frames = scanner.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame::Data("{\"a\":1}".to_string()),
                SseFrame::Data("{\"b\":2}".to_string()),
            ]
        );
    }

    #[test]
    fn buffers_partial_lines_across_reads() {
        let mut scanner = SseScanner::new();
        assert!(scanner.push(b"data: {\"par").is_empty());
        let frames = scanner.push(b"tial\":true}\n");
        assert_eq!(frames, vec![SseFrame::Data("{\"partial\":true}".to_string())]);
    }

    #[test]
    fn recognises_done_sentinel() {
        let mut scanner = SseScanner::new();
        let frames = scanner.push(b"data: last\n\ndata: [DONE]\n\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("last".to_string()), SseFrame::Done]
        );
    }

    #[test]
    fn ignores_non_data_fields_and_comments() {
        let mut scanner = SseScanner::new();
        let frames = scanner.push(b"event: message_start\nid: 7\n: keepalive\nretry: 100\ndata: x\n\n");
        assert_eq!(frames, vec![SseFrame::Data("x".to_string())]);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let mut scanner = SseScanner::new();
        let frames = scanner.push(b"data: one\r\n\r\ndata: two\r\n");
        assert_eq!(
            frames,
            vec![
                SseFrame::Data("one".to_string()),
                SseFrame::Data("two".to_string()),
            ]
        );
    }
}
