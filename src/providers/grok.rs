use serde::Deserialize;

use crate::error::GenerationError;
use crate::providers::{
    non_empty, reject_html, strip_code_fences, ProviderAdapter, ProviderId, WireRequest,
};

pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1/chat/completions";

/// Suffix appended to the system prompt; x.ai models drift into prose
/// without it.
const SYSTEM_SUFFIX: &str = "\n\nIt is EXTREMELY important that you return a fully valid, \
well-structured JSON object. Check your output carefully before responding.";

/// Formatting rules appended to the user prompt for the same reason.
const USER_SUFFIX: &str = "\n\nCRITICAL JSON FORMATTING INSTRUCTIONS:\n\
1. The output MUST be a valid JSON object with NO additional text, markdown, or explanations\n\
2. Do NOT wrap the JSON in code blocks or backticks, return the raw JSON directly\n\
3. Make sure each opening bracket has a closing bracket, especially with nested objects\n\
4. Ensure all quotes are properly escaped within strings\n\
5. Make sure there are no trailing commas in arrays or objects\n\
6. Validate your output is well-formed JSON before responding";

/// Grok (x.ai) chat completions. OpenAI-shaped envelope but a distinct
/// error object and tighter sampling for deterministic JSON output.
pub struct GrokAdapter;

#[derive(Deserialize)]
struct Envelope {
    error: Option<serde_json::Value>,
    choices: Option<Vec<Choice>>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl ProviderAdapter for GrokAdapter {
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
                "messages": [
                    {"role": "system", "content": format!("{system_prompt}{SYSTEM_SUFFIX}")},
                    {"role": "user", "content": format!("{user_prompt}{USER_SUFFIX}")},
                ],
                "model": model,
                "stream": false,
                "temperature": 0.1,
                "max_tokens": 16000,
                "top_p": 0.1,
            }),
        }
    }

    fn parse_response(&self, raw: &str) -> Result<String, GenerationError> {
        reject_html(ProviderId::Grok, raw)?;

        let envelope: Envelope = serde_json::from_str(raw).map_err(|e| {
            GenerationError::Protocol {
                provider: ProviderId::Grok,
                message: format!("failed to parse envelope: {e}"),
            }
        })?;

        if let Some(err) = envelope.error {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            return Err(GenerationError::Protocol {
                provider: ProviderId::Grok,
                message,
            });
        }

        let choices = envelope.choices.filter(|c| !c.is_empty()).ok_or_else(|| {
            GenerationError::Protocol {
                provider: ProviderId::Grok,
                message: "missing choices array".to_string(),
            }
        })?;

        let text = choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or_else(|| GenerationError::Protocol {
                provider: ProviderId::Grok,
                message: "missing content in first choice".to_string(),
            })?;

        non_empty(ProviderId::Grok, Some(strip_code_fences(&text)))
    }
}
