//! Embedding request/response types

use serde::{Deserialize, Serialize};

use super::response::Usage;

/// Embedding input: one string or a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    /// Single input
    Single(String),
    /// Batch of inputs, embedded in order
    Batch(Vec<String>),
}

impl From<&str> for EmbeddingInput {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

/// Embedding request, OpenAI `/embeddings` shaped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Embedding model id
    pub model: String,
    /// Text(s) to embed
    pub input: EmbeddingInput,
    /// Output dimensionality, for models that support truncation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// Opaque end-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl EmbeddingRequest {
    /// Request embedding a single input
    pub fn new(model: impl Into<String>, input: impl Into<EmbeddingInput>) -> Self {
        Self {
            model: model.into(),
            input: input.into(),
            dimensions: None,
            user: None,
        }
    }
}

/// One embedding vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    /// Object tag, `"embedding"`
    #[serde(default = "default_embedding_object")]
    pub object: String,
    /// Input index this vector belongs to
    pub index: u32,
    /// The vector
    pub embedding: Vec<f32>,
}

fn default_embedding_object() -> String {
    "embedding".to_string()
}

/// Embedding response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Object tag, `"list"`
    #[serde(default = "default_list_object")]
    pub object: String,
    /// Vectors, ordered by input index
    pub data: Vec<Embedding>,
    /// Model that produced the vectors
    pub model: String,
    /// Which adapter produced this response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Token accounting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

fn default_list_object() -> String {
    "list".to_string()
}
