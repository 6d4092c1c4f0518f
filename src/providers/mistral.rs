use serde::Deserialize;

use crate::error::GenerationError;
use crate::providers::{
    non_empty, reject_html, strip_code_fences, ProviderAdapter, ProviderId, WireRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// Mistral chat completions. Bearer auth, system-role message supported.
pub struct MistralAdapter;

#[derive(Deserialize)]
struct Envelope {
    error: Option<ApiError>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
    /// Alternate field locations seen in the wild when `content` is absent.
    text: Option<String>,
    body: Option<String>,
}

impl ProviderAdapter for MistralAdapter {
    fn build_request(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> WireRequest {
        WireRequest {
            url: base_url.to_string(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Authorization", format!("Bearer {}", api_key.trim())),
            ],
            body: serde_json::json!({
                "model": model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt},
                ],
                "temperature": 0.3,
            }),
        }
    }

    fn parse_response(&self, raw: &str) -> Result<String, GenerationError> {
        reject_html(ProviderId::Mistral, raw)?;

        let envelope: Envelope = serde_json::from_str(raw).map_err(|e| {
            GenerationError::Protocol {
                provider: ProviderId::Mistral,
                message: format!("failed to parse envelope: {e}"),
            }
        })?;

        if let Some(err) = envelope.error {
            return Err(GenerationError::Protocol {
                provider: ProviderId::Mistral,
                message: err.message.unwrap_or_else(|| "provider reported an error".to_string()),
            });
        }

        let text = envelope
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .and_then(|m| m.content.or(m.text).or(m.body))
            .map(|t| strip_code_fences(&t));

        non_empty(ProviderId::Mistral, text)
    }
}
