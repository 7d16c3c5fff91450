//! Shared adapter plumbing: auth schemes, SSE scanning, model discovery

pub mod discovery;
pub mod sse;

use reqwest::RequestBuilder;

/// How an adapter authenticates against its upstream
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// A named header carrying the raw key, e.g. Azure's `api-key`
    Header {
        /// Header name
        name: &'static str,
        /// Header value
        value: String,
    },
    /// `Authorization: Token <key>` (Replicate)
    Token(String),
    /// No credentials (local upstreams)
    None,
}

impl AuthScheme {
    /// Attach the credentials to an outgoing request
    pub fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            AuthScheme::Bearer(key) => builder.bearer_auth(key),
            AuthScheme::Header { name, value } => builder.header(*name, value),
            AuthScheme::Token(key) => builder.header("Authorization", format!("Token {key}")),
            AuthScheme::None => builder,
        }
    }

    /// The same credentials as header pairs, for proxy pass-through
    pub fn headers(&self) -> Vec<(String, String)> {
        match self {
            AuthScheme::Bearer(key) => {
                vec![("Authorization".to_string(), format!("Bearer {key}"))]
            }
            AuthScheme::Header { name, value } => vec![(name.to_string(), value.clone())],
            AuthScheme::Token(key) => {
                vec![("Authorization".to_string(), format!("Token {key}"))]
            }
            AuthScheme::None => Vec::new(),
        }
    }
}

/// Normalise a configured base URL: trailing slashes are always trimmed so
/// path concatenation stays predictable.
pub fn trim_base_url(base_url: impl Into<String>) -> String {
    let mut url = base_url.into();
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_trimmed() {
        assert_eq!(trim_base_url("https://api.example.com/"), "https://api.example.com");
        assert_eq!(trim_base_url("https://api.example.com//"), "https://api.example.com");
        assert_eq!(trim_base_url("https://api.example.com"), "https://api.example.com");
    }

    #[test]
    fn auth_headers_match_apply_semantics() {
        let bearer = AuthScheme::Bearer("k1".to_string());
        assert_eq!(
            bearer.headers(),
            vec![("Authorization".to_string(), "Bearer k1".to_string())]
        );

        let azure = AuthScheme::Header {
            name: "api-key",
            value: "k2".to_string(),
        };
        assert_eq!(azure.headers(), vec![("api-key".to_string(), "k2".to_string())]);

        let token = AuthScheme::Token("k3".to_string());
        assert_eq!(
            token.headers(),
            vec![("Authorization".to_string(), "Token k3".to_string())]
        );

        assert!(AuthScheme::None.headers().is_empty());
    }
}
