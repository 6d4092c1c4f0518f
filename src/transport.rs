use std::time::Duration;

use reqwest::Client;

use crate::error::GenerationError;
use crate::providers::{ProviderId, WireRequest};

/// Generated documents can run to tens of KB; 2MB is comfortably above
/// that and below anything pathological.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Cap on error-body text carried inside an error value.
const MAX_ERROR_DETAIL_CHARS: usize = 500;

/// Thin wrapper over one shared reqwest client. Issues a single POST per
/// call; cancellation happens by dropping the future, which aborts the
/// underlying connection.
pub struct HttpTransport {
    client: Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Execute one wire request and return the raw response body text.
    /// Non-2xx statuses become [`GenerationError::Transport`] carrying the
    /// provider-reported error field when the body is JSON, else the
    /// status text.
    pub async fn execute(
        &self,
        provider: ProviderId,
        wire: &WireRequest,
    ) -> Result<String, GenerationError> {
        let mut request = self.client.post(&wire.url);
        for (name, value) in &wire.headers {
            request = request.header(*name, value);
        }

        let response = request.json(&wire.body).send().await?;
        let status = response.status();

        let bytes = response.bytes().await.map_err(|e| GenerationError::Transport {
            provider,
            message: format!("failed to read response body: {e}"),
            status: Some(status.as_u16()),
        })?;

        if bytes.len() > MAX_RESPONSE_BYTES {
            return Err(GenerationError::Transport {
                provider,
                message: format!(
                    "response too large: {} bytes (max {MAX_RESPONSE_BYTES})",
                    bytes.len()
                ),
                status: Some(status.as_u16()),
            });
        }

        let body = String::from_utf8_lossy(&bytes).into_owned();

        if !status.is_success() {
            let detail = provider_error_detail(&body)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unknown error".to_string());
            let detail: String = detail.chars().take(MAX_ERROR_DETAIL_CHARS).collect();
            return Err(GenerationError::Transport {
                provider,
                message: detail,
                status: Some(status.as_u16()),
            });
        }

        Ok(body)
    }
}

/// Pull a human-readable detail out of a JSON error body. Providers
/// disagree on the field name; check the usual suspects in order.
fn provider_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    for key in ["error", "message", "detail", "info"] {
        let Some(field) = value.get(key) else {
            continue;
        };
        let detail = match field {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => continue,
            object => object
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| object.to_string()),
        };
        if !detail.is_empty() {
            return Some(detail);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_detail_prefers_error_field() {
        let body = r#"{"error": {"message": "Invalid API key"}, "message": "other"}"#;
        assert_eq!(provider_error_detail(body).as_deref(), Some("Invalid API key"));
    }

    #[test]
    fn error_detail_accepts_plain_strings() {
        assert_eq!(
            provider_error_detail(r#"{"detail": "quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
    }

    #[test]
    fn error_detail_ignores_non_json_bodies() {
        assert_eq!(provider_error_detail("<html>nope</html>"), None);
    }
}
