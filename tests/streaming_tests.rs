//! Streaming integration tests against mock SSE upstreams

use futures::StreamExt;
use llm_gateway::core::providers::ai21::Ai21Provider;
use llm_gateway::core::providers::anthropic::AnthropicProvider;
use llm_gateway::core::providers::cohere::CohereProvider;
use llm_gateway::core::providers::openai::OpenAiProvider;
use llm_gateway::core::traits::Provider;
use llm_gateway::core::types::{ChatRequest, FinishReason, GatewayError, RequestContext};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(events: &[&str]) -> String {
    events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect()
}

fn openai_chunk(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "created": 1736900000,
        "model": "gpt-4o",
        "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}]
    })
    .to_string()
}

#[tokio::test]
async fn openai_stream_ends_cleanly_on_done_sentinel() {
    let server = MockServer::start().await;
    let body = sse_body(&[&openai_chunk("Hel"), &openai_chunk("lo"), "[DONE]"]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("sk", server.uri());
    let request = ChatRequest::new("gpt-4o").user("Hi");
    let mut stream = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap();

    let mut contents = Vec::new();
    while let Some(item) = stream.next().await {
        contents.push(item.unwrap().first_content().unwrap_or_default().to_string());
    }
    // One chunk per parsable non-sentinel data line, no error
    assert_eq!(contents, vec!["Hel", "lo"]);
}

#[tokio::test]
async fn malformed_stream_lines_are_skipped_silently() {
    let server = MockServer::start().await;
    let body = sse_body(&[&openai_chunk("a"), "{not json", &openai_chunk("b"), "[DONE]"]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("sk", server.uri());
    let request = ChatRequest::new("gpt-4o").user("Hi");
    let mut stream = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap();

    let mut contents = Vec::new();
    while let Some(item) = stream.next().await {
        contents.push(item.unwrap().first_content().unwrap_or_default().to_string());
    }
    assert_eq!(contents, vec!["a", "b"]);
}

#[tokio::test]
async fn anthropic_typed_events_translate_in_order() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        &json!({
            "type": "message_start",
            "message": {"id": "msg_123", "model": "claude-3-haiku", "role": "assistant"}
        })
        .to_string(),
        &json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": "Hello"}
        })
        .to_string(),
        &json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "text_delta", "text": " world"}
        })
        .to_string(),
        &json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn"},
            "usage": {"input_tokens": 8, "output_tokens": 2}
        })
        .to_string(),
        &json!({"type": "message_stop"}).to_string(),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = AnthropicProvider::with_base_url("sk-ant", server.uri());
    let request = ChatRequest::new("claude-3-haiku").user("Hi");
    let mut stream = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap();

    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }

    // role frame, two content deltas, one finish frame
    assert_eq!(chunks.len(), 4);
    assert!(chunks[0].choices[0].delta.role.is_some());
    assert_eq!(chunks[0].id, "msg_123");
    assert_eq!(chunks[1].first_content(), Some("Hello"));
    assert_eq!(chunks[2].first_content(), Some(" world"));
    let last = chunks.last().unwrap();
    assert_eq!(last.choices.len(), 1);
    assert_eq!(last.choices[0].finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn cohere_content_delta_and_message_end_translate() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        &json!({"type": "message-start", "id": "res_9"}).to_string(),
        &json!({
            "type": "content-delta",
            "index": 0,
            "delta": {"message": {"content": {"text": "Hello"}}}
        })
        .to_string(),
        &json!({
            "type": "content-delta",
            "index": 0,
            "delta": {"message": {"content": {"text": " there"}}}
        })
        .to_string(),
        &json!({
            "type": "message-end",
            "delta": {
                "finish_reason": "COMPLETE",
                "usage": {"billed_units": {"input_tokens": 4, "output_tokens": 2}}
            }
        })
        .to_string(),
    ]);
    Mock::given(method("POST"))
        .and(path("/v2/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = CohereProvider::with_base_url("co", server.uri());
    let request = ChatRequest::new("command-r").user("Hi");
    let mut stream = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap();

    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        chunks.push(item.unwrap());
    }

    assert_eq!(chunks[1].first_content(), Some("Hello"));
    assert_eq!(chunks[2].first_content(), Some(" there"));
    let last = chunks.last().unwrap();
    assert_eq!(
        last.choices[0].finish_reason,
        Some(FinishReason::Other("COMPLETE".to_string()))
    );
    assert_eq!(last.usage.as_ref().unwrap().total_tokens, 6);
}

#[tokio::test]
async fn jurassic_stream_refused_with_no_chunks() {
    // No mock server needed: the refusal happens before any request
    let provider = Ai21Provider::with_base_url("key", "http://127.0.0.1:9");
    let request = ChatRequest::new("j2-ultra").user("Hi");
    let err = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Unsupported { .. }));
}

#[tokio::test]
async fn anthropic_error_event_terminates_stream_with_error_item() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        &json!({
            "type": "message_start",
            "message": {"id": "msg_1", "model": "claude-3-haiku"}
        })
        .to_string(),
        &json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })
        .to_string(),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::with_base_url("sk-ant", server.uri());
    let request = ChatRequest::new("claude-3-haiku").user("Hi");
    let mut stream = provider
        .complete_stream(&RequestContext::new(), &request)
        .await
        .unwrap();

    let first = stream.next().await.unwrap();
    assert!(first.is_ok());
    let second = stream.next().await.unwrap();
    assert!(second.unwrap_err().to_string().contains("Overloaded"));
    // Error is terminal
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn cancellation_closes_the_stream_promptly() {
    let server = MockServer::start().await;
    // A long body the consumer will never fully read
    let mut events: Vec<String> = (0..200).map(|i| openai_chunk(&format!("tok{i}"))).collect();
    events.push("[DONE]".to_string());
    let refs: Vec<&str> = events.iter().map(String::as_str).collect();
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&refs), "text/event-stream")
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .mount(&server)
        .await;

    let provider = OpenAiProvider::with_base_url("sk", server.uri());
    let ctx = RequestContext::new();
    let request = ChatRequest::new("gpt-4o").user("Hi");
    let mut stream = provider.complete_stream(&ctx, &request).await.unwrap();

    let first = stream.next().await;
    assert!(first.is_some());

    ctx.cancellation.cancel();

    // Bounded: the stream must close without draining the remaining frames
    let drained = tokio::time::timeout(std::time::Duration::from_secs(2), async {
        let mut rest = 0usize;
        while stream.next().await.is_some() {
            rest += 1;
        }
        rest
    })
    .await
    .expect("stream did not close after cancellation");
    assert!(drained < 200);
}
