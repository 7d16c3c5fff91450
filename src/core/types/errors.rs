//! Gateway error taxonomy
//!
//! One error type crosses every layer. Each variant maps to a routing
//! policy: validation and configuration errors are never retried, transport
//! and provider errors are retried then failed over, cancellation
//! short-circuits everything.

/// Unified gateway error
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request rejected before any network I/O
    #[error("{0}")]
    Validation(String),

    /// Upstream answered with a non-success status
    #[error("{provider} API error ({status}): {message}")]
    Provider {
        /// Adapter name
        provider: String,
        /// HTTP status code
        status: u16,
        /// Parsed envelope message, or the raw body when parsing failed
        message: String,
    },

    /// DNS/TCP/TLS/read failure before a status line was obtained
    #[error("network error: {0}")]
    Network(String),

    /// Bad routing or provider configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,

    /// Capability not implemented by this provider
    #[error("{provider} does not support {operation}")]
    Unsupported {
        /// Adapter name
        provider: String,
        /// Operation that was requested
        operation: String,
    },

    /// Upstream payload did not match the expected shape
    #[error("parse error: {0}")]
    Parsing(String),

    /// JSON (de)serialisation failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A plugin failed
    #[error("plugin {plugin}: {message}")]
    Plugin {
        /// Plugin name
        plugin: String,
        /// Failure detail
        message: String,
    },
}

impl GatewayError {
    /// Validation failure with a plain message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Upstream application error in the canonical
    /// `<provider> API error (<status>): <detail>` form
    pub fn provider(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Transport-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Configuration failure
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Missing capability
    pub fn unsupported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            provider: provider.into(),
            operation: operation.into(),
        }
    }

    /// Malformed upstream payload
    pub fn parsing(message: impl Into<String>) -> Self {
        Self::Parsing(message.into())
    }

    /// Plugin failure
    pub fn plugin(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// True for errors the router may retry on the same target
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Network(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_renders_canonical_form() {
        let err = GatewayError::provider("anthropic", 429, "rate limited");
        assert_eq!(err.to_string(), "anthropic API error (429): rate limited");
    }

    #[test]
    fn retryability_by_kind() {
        assert!(GatewayError::provider("p", 500, "x").is_retryable());
        assert!(GatewayError::network("reset").is_retryable());
        assert!(!GatewayError::validation("bad").is_retryable());
        assert!(!GatewayError::configuration("bad").is_retryable());
        assert!(!GatewayError::Cancelled.is_retryable());
    }
}
