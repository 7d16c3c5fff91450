//! Shared model discovery over OpenAI-compatible `GET /models` endpoints

use serde::Deserialize;

use super::AuthScheme;
use crate::core::types::{GatewayError, ModelInfo, RequestContext};

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    owned_by: Option<String>,
}

/// Fetch the upstream's model listing.
///
/// Performs `GET {base}/models` with the adapter's credentials and parses
/// the `{object, data: [...]}` shape; `owned_by` falls back to the provider
/// name when the upstream omits it.
pub async fn fetch_models(
    http: &reqwest::Client,
    base_url: &str,
    auth: &AuthScheme,
    provider: &str,
    ctx: &RequestContext,
) -> Result<Vec<ModelInfo>, GatewayError> {
    let url = format!("{base_url}/models");
    let request = auth.apply(http.get(&url));

    let response = tokio::select! {
        _ = ctx.cancellation.cancelled() => return Err(GatewayError::Cancelled),
        response = request.send() => response?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::provider(provider, status.as_u16(), body));
    }

    let listing: ModelList = response
        .json()
        .await
        .map_err(|err| GatewayError::parsing(format!("{provider} model listing: {err}")))?;

    Ok(listing
        .data
        .into_iter()
        .map(|entry| ModelInfo {
            id: entry.id,
            object: "model".to_string(),
            created: entry.created,
            owned_by: entry.owned_by.unwrap_or_else(|| provider.to_string()),
        })
        .collect())
}
