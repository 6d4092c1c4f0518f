use serde::Deserialize;

use crate::error::GenerationError;
use crate::providers::{
    non_empty, reject_html, strip_code_fences, ProviderAdapter, ProviderId, WireRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter chat completions. Bearer auth plus the attribution headers
/// OpenRouter uses for app ranking.
pub struct OpenRouterAdapter;

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
}

impl ProviderAdapter for OpenRouterAdapter {
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
                ("HTTP-Referer", "https://flowforge.dev".to_string()),
                ("X-Title", "FlowForge".to_string()),
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
        reject_html(ProviderId::OpenRouter, raw)?;

        let envelope: Envelope = serde_json::from_str(raw).map_err(|e| {
            GenerationError::Protocol {
                provider: ProviderId::OpenRouter,
                message: format!("failed to parse envelope: {e}"),
            }
        })?;

        if let Some(err) = envelope.error {
            return Err(GenerationError::Protocol {
                provider: ProviderId::OpenRouter,
                message: err.message.unwrap_or_else(|| "provider reported an error".to_string()),
            });
        }

        let text = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string());

        // OpenRouter proxies many upstreams; an HTML body inside an otherwise
        // valid envelope means the routed request hit an error page.
        if let Some(ref t) = text {
            reject_html(ProviderId::OpenRouter, t)?;
        }

        non_empty(ProviderId::OpenRouter, text.map(|t| strip_code_fences(&t)))
    }
}
