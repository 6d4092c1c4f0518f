use serde::Deserialize;

use crate::error::GenerationError;
use crate::providers::{
    folded_prompt, non_empty, reject_html, strip_code_fences, ProviderAdapter, ProviderId,
    WireRequest,
};

/// Base path; the adapter appends `/models/{model}:generateContent?key={key}`.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini generateContent. No system role — the system prompt is
/// folded into the single user part. The API key travels as a URL query
/// parameter and the model name is embedded in the URL path.
pub struct GeminiAdapter;

#[derive(Deserialize)]
struct Envelope {
    error: Option<ApiError>,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl ProviderAdapter for GeminiAdapter {
    fn build_request(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> WireRequest {
        let base = base_url.trim_end_matches('/');
        WireRequest {
            url: format!(
                "{base}/models/{model}:generateContent?key={}",
                api_key.trim()
            ),
            headers: vec![("Content-Type", "application/json".to_string())],
            body: serde_json::json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": [{"text": folded_prompt(system_prompt, user_prompt)}],
                    }
                ],
                "generationConfig": {"temperature": 0.3},
            }),
        }
    }

    fn parse_response(&self, raw: &str) -> Result<String, GenerationError> {
        reject_html(ProviderId::Gemini, raw)?;

        let envelope: Envelope = serde_json::from_str(raw).map_err(|e| {
            GenerationError::Protocol {
                provider: ProviderId::Gemini,
                message: format!("failed to parse envelope: {e}"),
            }
        })?;

        if let Some(err) = envelope.error {
            return Err(GenerationError::Protocol {
                provider: ProviderId::Gemini,
                message: err.message.unwrap_or_else(|| "provider reported an error".to_string()),
            });
        }

        let text = envelope
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .map(|t| strip_code_fences(&t));

        non_empty(ProviderId::Gemini, text)
    }
}
