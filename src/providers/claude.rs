use serde::Deserialize;

use crate::error::GenerationError;
use crate::providers::{
    folded_prompt, non_empty, reject_html, strip_code_fences, ProviderAdapter, ProviderId,
    WireRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u64 = 4096;

/// Anthropic Messages API. Key goes in `x-api-key`, not a bearer header,
/// and the system prompt is folded into the single user message.
pub struct ClaudeAdapter;

#[derive(Deserialize)]
struct Envelope {
    error: Option<serde_json::Value>,
    content: Option<Vec<ContentBlock>>,
    /// Legacy completions-era field, still emitted by some proxies.
    completion: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: Option<String>,
    text: Option<String>,
}

impl ProviderAdapter for ClaudeAdapter {
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
                ("x-api-key", api_key.trim().to_string()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                (
                    "anthropic-dangerous-direct-browser-access",
                    "true".to_string(),
                ),
            ],
            body: serde_json::json!({
                "model": model,
                "max_tokens": MAX_TOKENS,
                "messages": [
                    {"role": "user", "content": folded_prompt(system_prompt, user_prompt)},
                ],
                "temperature": 0.2,
            }),
        }
    }

    fn parse_response(&self, raw: &str) -> Result<String, GenerationError> {
        reject_html(ProviderId::Claude, raw)?;

        let envelope: Envelope = serde_json::from_str(raw).map_err(|e| {
            GenerationError::Protocol {
                provider: ProviderId::Claude,
                message: format!("failed to parse envelope: {e}"),
            }
        })?;

        if let Some(err) = envelope.error {
            let message = match &err {
                serde_json::Value::String(s) => s.clone(),
                other => other
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| other.to_string()),
            };
            return Err(GenerationError::Protocol {
                provider: ProviderId::Claude,
                message,
            });
        }

        if let Some(blocks) = envelope.content {
            let joined = blocks
                .into_iter()
                .filter(|b| b.block_type.as_deref() == Some("text"))
                .filter_map(|b| b.text)
                .collect::<Vec<_>>()
                .join("\n");

            reject_html(ProviderId::Claude, &joined)?;
            return non_empty(ProviderId::Claude, Some(strip_code_fences(&joined)));
        }

        if let Some(completion) = envelope.completion {
            return non_empty(ProviderId::Claude, Some(strip_code_fences(&completion)));
        }

        Err(GenerationError::Protocol {
            provider: ProviderId::Claude,
            message: "unexpected response format: no content blocks or completion".to_string(),
        })
    }
}
