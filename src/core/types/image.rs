//! Image generation request/response types

use serde::{Deserialize, Serialize};

/// Image generation request, OpenAI `/images/generations` shaped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRequest {
    /// Image model id
    pub model: String,
    /// Text prompt
    pub prompt: String,
    /// Number of images
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    /// Size hint such as `"1024x1024"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// `"url"` or `"b64_json"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<String>,
    /// Opaque end-user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ImageRequest {
    /// Request one image for a prompt
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            n: None,
            size: None,
            response_format: None,
            user: None,
        }
    }
}

/// One generated image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Result URL, verbatim from the upstream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64 payload when `b64_json` was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub b64_json: Option<String>,
    /// Prompt after upstream rewriting, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// Image generation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Unix creation timestamp
    #[serde(default)]
    pub created: i64,
    /// Generated images
    pub data: Vec<ImageData>,
    /// Which adapter produced this response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}
