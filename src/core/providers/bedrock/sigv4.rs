//! AWS Signature Version 4 signing for Bedrock runtime calls

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::core::types::GatewayError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "bedrock";

/// Signs Bedrock runtime requests with SigV4
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: String,
}

impl SigV4Signer {
    /// Signer for a region with static credentials
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        session_token: Option<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            session_token,
            region: region.into(),
        }
    }

    /// Produce the signed headers for a POST of `body` to `url`.
    ///
    /// Returns `(name, value)` pairs including `host`, `x-amz-date`,
    /// `authorization`, and the session token when present.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>, GatewayError> {
        let parsed = url::Url::parse(url)
            .map_err(|err| GatewayError::configuration(format!("invalid bedrock url: {err}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| GatewayError::configuration("bedrock url has no host"))?
            .to_string();
        let path = parsed.path().to_string();
        let query = parsed.query().unwrap_or("").to_string();

        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(body));

        // Canonical headers, sorted by lowercase name
        let mut headers: Vec<(String, String)> = vec![
            ("host".to_string(), host),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(token) = &self.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.to_uppercase(),
            path,
            query,
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!("{date_stamp}/{}/{SERVICE}/aws4_request", self.region);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = self.signature(&string_to_sign, &date_stamp)?;
        let authorization = format!(
            "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        );

        let mut out = headers;
        out.push(("authorization".to_string(), authorization));
        Ok(out)
    }

    fn signature(&self, string_to_sign: &str, date_stamp: &str) -> Result<String, GatewayError> {
        let mut key = hmac_sign(format!("AWS4{}", self.secret_key).as_bytes(), date_stamp)?;
        for part in [self.region.as_str(), SERVICE, "aws4_request"] {
            key = hmac_sign(&key, part)?;
        }
        Ok(hex::encode(hmac_sign(&key, string_to_sign)?))
    }
}

fn hmac_sign(key: &[u8], data: &str) -> Result<Vec<u8>, GatewayError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| GatewayError::configuration(format!("hmac key error: {err}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn signed_headers_include_required_fields() {
        let signer = SigV4Signer::new("AKIDEXAMPLE", "secret", None, "us-east-1");
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let headers = signer
            .sign(
                "POST",
                "https://bedrock-runtime.us-east-1.amazonaws.com/model/anthropic.claude-3/invoke",
                br#"{"messages":[]}"#,
                now,
            )
            .unwrap();

        let names: Vec<&str> = headers.iter().map(|(name, _)| name.as_str()).collect();
        assert!(names.contains(&"host"));
        assert!(names.contains(&"x-amz-date"));
        assert!(names.contains(&"authorization"));

        let auth = &headers.iter().find(|(name, _)| name == "authorization").unwrap().1;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240501/us-east-1/bedrock/aws4_request"));
        assert!(auth.contains("SignedHeaders=host;x-amz-date"));
    }

    #[test]
    fn session_token_joins_signed_headers() {
        let signer = SigV4Signer::new("key", "secret", Some("token".to_string()), "eu-west-1");
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let headers = signer
            .sign(
                "POST",
                "https://bedrock-runtime.eu-west-1.amazonaws.com/model/m/invoke",
                b"{}",
                now,
            )
            .unwrap();
        assert!(headers
            .iter()
            .any(|(name, value)| name == "x-amz-security-token" && value == "token"));
        let auth = &headers.iter().find(|(name, _)| name == "authorization").unwrap().1;
        assert!(auth.contains("x-amz-security-token"));
    }

    #[test]
    fn signature_is_deterministic() {
        let signer = SigV4Signer::new("key", "secret", None, "us-east-1");
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let url = "https://bedrock-runtime.us-east-1.amazonaws.com/model/m/invoke";
        let a = signer.sign("POST", url, b"{}", now).unwrap();
        let b = signer.sign("POST", url, b"{}", now).unwrap();
        assert_eq!(a, b);
    }
}
