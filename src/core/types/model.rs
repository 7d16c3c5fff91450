//! Model enumeration types

use serde::{Deserialize, Serialize};

/// One entry of a model listing, OpenAI `GET /models` shaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Object tag, `"model"`
    #[serde(default = "default_model_object")]
    pub object: String,
    /// Unix creation timestamp as reported by the upstream, 0 when unknown
    #[serde(default)]
    pub created: i64,
    /// Owning organisation; defaults to the provider name
    #[serde(default)]
    pub owned_by: String,
}

fn default_model_object() -> String {
    "model".to_string()
}

impl ModelInfo {
    /// Static entry owned by a provider
    pub fn new(id: impl Into<String>, owned_by: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: default_model_object(),
            created: 0,
            owned_by: owned_by.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let info: ModelInfo = serde_json::from_str(r#"{"id": "gpt-4o"}"#).unwrap();
        assert_eq!(info.object, "model");
        assert_eq!(info.created, 0);
        assert_eq!(info.owned_by, "");
    }
}
