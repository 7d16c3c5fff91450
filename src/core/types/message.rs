//! Chat message types, including the string-or-parts content union

use serde::{Deserialize, Serialize};

use super::tools::ToolCall;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction
    System,
    /// End-user turn
    User,
    /// Model turn
    Assistant,
    /// Tool result linked via `tool_call_id`
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Message content: a plain string or an ordered list of content parts.
///
/// Serialised polymorphically: `Text` as a JSON string, `Parts` as a JSON
/// array, matching what OpenAI-shaped upstreams exchange on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Multimodal parts
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flatten to plain text by concatenating text parts in order.
    ///
    /// Adapters that cannot consume multimodal parts use this shadow copy,
    /// so the concatenation must stay deterministic.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .concat(),
        }
    }

    /// True when there is no text and no parts
    pub fn is_empty(&self) -> bool {
        match self {
            MessageContent::Text(text) => text.is_empty(),
            MessageContent::Parts(parts) => parts.is_empty(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One entry of a multi-part message body, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text fragment
    Text {
        /// The text
        text: String,
    },
    /// Image reference
    ImageUrl {
        /// Image location and fidelity hint
        image_url: ImageUrl,
    },
}

/// Image reference inside a content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// HTTP(S) or data URL
    pub url: String,
    /// Fidelity hint (`low`, `high`, `auto`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: MessageRole,
    /// String-or-parts content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// Sender name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls produced by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Links a tool-result message to the call it answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Create a message with plain-text content
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content.into())
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }

    /// Tool-result message
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(MessageContent::Text(content.into())),
            name: None,
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Plain-text view of the content; parts are concatenated in order
    pub fn text(&self) -> String {
        self.content.as_ref().map(|c| c.text()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_serialises_as_string() {
        let message = ChatMessage::user("Hi");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["content"], "Hi");
        assert_eq!(json["role"], "user");
        assert!(json.get("name").is_none());
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn content_serialises_as_parts_array() {
        let message = ChatMessage::new(
            MessageRole::User,
            MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "Look at ".to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "https://example.com/cat.png".to_string(),
                        detail: Some("low".to_string()),
                    },
                },
                ContentPart::Text {
                    text: "this".to_string(),
                },
            ]),
        );
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["content"].is_array());
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][1]["type"], "image_url");
        assert_eq!(message.text(), "Look at this");
    }

    #[test]
    fn content_round_trips_through_json() {
        let original = MessageContent::Parts(vec![
            ContentPart::Text {
                text: "Hello".to_string(),
            },
            ContentPart::Text {
                text: " world".to_string(),
            },
        ]);
        let json = serde_json::to_string(&original).unwrap();
        let decoded: MessageContent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.text(), "Hello world");
    }

    #[test]
    fn string_content_deserialises_to_text() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"role":"assistant","content":"done"}"#).unwrap();
        assert_eq!(message.content, Some(MessageContent::Text("done".into())));
        assert_eq!(message.text(), "done");
    }

    #[test]
    fn array_content_deserialises_to_parts() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"role":"user","content":[{"type":"text","text":"a"},{"type":"text","text":"b"}]}"#,
        )
        .unwrap();
        match &message.content {
            Some(MessageContent::Parts(parts)) => assert_eq!(parts.len(), 2),
            other => panic!("expected parts, got {:?}", other),
        }
        assert_eq!(message.text(), "ab");
    }
}
