//! Chat completion request and its pure validation

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::GatewayError;
use super::message::{ChatMessage, MessageContent, MessageRole};
use super::tools::{ResponseFormat, Tool, ToolChoice};

/// Provider-agnostic chat completion request.
///
/// Mirrors the OpenAI Chat Completions schema at the top level; adapters map
/// it onto each back-end's wire format and drop unsupported options silently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier, forwarded or rewritten by the adapter
    pub model: String,
    /// Conversation so far, oldest first
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature, 0.0–2.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass, 0.0–1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Number of choices to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Reproducibility seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Output token cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Output token cap including reasoning tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    /// Presence penalty, -2.0–2.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Frequency penalty, -2.0–2.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// Tools the model may call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// Tool selection strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Output shape constraint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Return log probabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<bool>,
    /// How many top logprobs per token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
    /// Request a streamed response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Opaque end-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Token bias map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logit_bias: Option<HashMap<String, f32>>,
}

impl ChatRequest {
    /// New request for a model, no messages yet
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Append a message
    pub fn message(mut self, role: MessageRole, content: impl Into<MessageContent>) -> Self {
        self.messages.push(ChatMessage {
            role,
            content: Some(content.into()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        });
        self
    }

    /// Append a system message
    pub fn system(self, content: impl Into<String>) -> Self {
        self.message(MessageRole::System, content.into())
    }

    /// Append a user message
    pub fn user(self, content: impl Into<String>) -> Self {
        self.message(MessageRole::User, content.into())
    }

    /// Append an assistant message
    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.message(MessageRole::Assistant, content.into())
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max_tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set tools
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// True when the caller asked for streaming
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(false)
    }

    /// Validate the request without performing any I/O.
    ///
    /// Runs before plugins and before any network call; a failure here is
    /// never retried and never reaches `on_error` plugins.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.model.trim().is_empty() {
            return Err(GatewayError::validation("model is required"));
        }
        if self.messages.is_empty() {
            return Err(GatewayError::validation("messages must not be empty"));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(GatewayError::validation(
                    "temperature must be between 0 and 2",
                ));
            }
        }
        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(GatewayError::validation("top_p must be between 0 and 1"));
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens == 0 {
                return Err(GatewayError::validation("max_tokens must be positive"));
            }
        }
        if let Some(max_completion_tokens) = self.max_completion_tokens {
            if max_completion_tokens == 0 {
                return Err(GatewayError::validation(
                    "max_completion_tokens must be positive",
                ));
            }
        }
        if let Some(presence_penalty) = self.presence_penalty {
            if !(-2.0..=2.0).contains(&presence_penalty) {
                return Err(GatewayError::validation(
                    "presence_penalty must be between -2 and 2",
                ));
            }
        }
        if let Some(frequency_penalty) = self.frequency_penalty {
            if !(-2.0..=2.0).contains(&frequency_penalty) {
                return Err(GatewayError::validation(
                    "frequency_penalty must be between -2 and 2",
                ));
            }
        }
        Ok(())
    }

    /// Last user message flattened to text; used by prompt-only back-ends
    pub fn last_user_text(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.text())
    }

    /// All system messages flattened and joined, for back-ends that take a
    /// single top-level system string
    pub fn system_text(&self) -> Option<String> {
        let joined = self
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n");
        if joined.is_empty() { None } else { Some(joined) }
    }
}
