//! Tool/function calling and response format types

use serde::{Deserialize, Serialize};

/// A tool the model may call. Only `function` tools exist today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool kind, `"function"`
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function schema
    pub function: FunctionDef,
}

impl Tool {
    /// Function tool from name, description, and JSON Schema parameters
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDef {
                name: name.into(),
                description: Some(description.into()),
                parameters: Some(parameters),
            },
        }
    }
}

/// Function declaration; `parameters` is opaque JSON Schema and must
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the arguments, kept opaque
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// A tool invocation emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back in the tool-result message
    pub id: String,
    /// Tool kind, `"function"`
    #[serde(rename = "type")]
    pub call_type: String,
    /// Invoked function and serialised arguments
    pub function: FunctionCall,
}

/// Function name plus raw JSON argument string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// Arguments as a JSON-encoded string, exactly as the upstream sent them
    pub arguments: String,
}

/// Tool selection strategy: a mode string or a specific function pin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// `"auto"`, `"none"`, or `"required"`
    Mode(String),
    /// Force one specific function
    Function {
        /// `"function"`
        #[serde(rename = "type")]
        choice_type: String,
        /// Target function
        function: ToolChoiceFunction,
    },
}

/// Function pinned by a forced tool choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    /// Function name
    pub name: String,
}

/// Output shape constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text
    Text,
    /// Any syntactically valid JSON object
    JsonObject,
    /// JSON constrained by a schema
    JsonSchema {
        /// Schema body, opaque to the gateway
        json_schema: serde_json::Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_parameters_round_trip_opaquely() {
        let schema = json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"],
            "x-vendor-extension": {"weird": [1, 2, 3]}
        });
        let tool = Tool::function("get_weather", "Look up weather", schema.clone());
        let encoded = serde_json::to_value(&tool).unwrap();
        assert_eq!(encoded["function"]["parameters"], schema);
        let decoded: Tool = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, tool);
    }

    #[test]
    fn tool_choice_modes() {
        let auto: ToolChoice = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(auto, ToolChoice::Mode("auto".to_string()));

        let pinned: ToolChoice = serde_json::from_str(
            r#"{"type":"function","function":{"name":"get_weather"}}"#,
        )
        .unwrap();
        match pinned {
            ToolChoice::Function { function, .. } => assert_eq!(function.name, "get_weather"),
            other => panic!("expected function pin, got {:?}", other),
        }
    }

    #[test]
    fn response_format_tags() {
        assert_eq!(
            serde_json::to_value(ResponseFormat::JsonObject).unwrap(),
            json!({"type": "json_object"})
        );
        assert_eq!(
            serde_json::to_value(ResponseFormat::Text).unwrap(),
            json!({"type": "text"})
        );
    }
}
