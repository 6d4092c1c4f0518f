pub mod claude;
pub mod gemini;
pub mod grok;
pub mod groq;
pub mod mistral;
pub mod openai;
pub mod openrouter;
pub mod registry;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Closed set of supported providers. Adding a provider means adding a
/// variant here plus an adapter module; no shared branch is edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
    Mistral,
    Claude,
    OpenRouter,
    Grok,
    Groq,
}

impl ProviderId {
    pub const ALL: [ProviderId; 7] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Mistral,
        ProviderId::Claude,
        ProviderId::OpenRouter,
        ProviderId::Grok,
        ProviderId::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Mistral => "mistral",
            Self::Claude => "claude",
            Self::OpenRouter => "openrouter",
            Self::Grok => "grok",
            Self::Groq => "groq",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "mistral" => Ok(Self::Mistral),
            "claude" => Ok(Self::Claude),
            "openrouter" => Ok(Self::OpenRouter),
            "grok" => Ok(Self::Grok),
            "groq" => Ok(Self::Groq),
            other => Err(GenerationError::Configuration(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}

/// A fully-formed outbound HTTP request for one provider.
/// Header names are static; values may embed the API key, so this type
/// deliberately has no Debug impl that would print them.
pub struct WireRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: serde_json::Value,
}

impl std::fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireRequest")
            .field("url", &redact_query(&self.url))
            .field(
                "headers",
                &self.headers.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Strip a query string before logging — Gemini carries the key there.
fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Trait for translating a generic generation request into one provider's
/// wire format and its reply back into plain text. Each provider has its
/// own envelope; none may assume the shape of another's.
pub trait ProviderAdapter: Send + Sync {
    /// Build the outbound request. `base_url` is the provider endpoint from
    /// the registry entry (overridable for tests).
    fn build_request(
        &self,
        base_url: &str,
        api_key: &str,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> WireRequest;

    /// Extract the assistant's text from the provider's JSON envelope.
    /// Fails on explicit error objects, missing fields, or HTML bodies.
    fn parse_response(&self, raw: &str) -> Result<String, GenerationError>;
}

/// Separator used when a provider has no system-role concept and the system
/// prompt must be folded into the user message.
pub(crate) const USER_REQUEST_SEPARATOR: &str = "\n\n===USER REQUEST===\n";

/// Reminder appended to folded prompts so the model skips markdown framing.
pub(crate) const RAW_JSON_REMINDER: &str =
    "\n\nRemember: Return ONLY valid JSON without any markdown code blocks or formatting.";

/// Fold system + user prompts into a single instruction block.
pub(crate) fn folded_prompt(system_prompt: &str, user_prompt: &str) -> String {
    format!("{system_prompt}{USER_REQUEST_SEPARATOR}{user_prompt}{RAW_JSON_REMINDER}")
}

/// Remove surrounding and embedded ``` fence markers, with or without a
/// language tag, then trim.
pub(crate) fn strip_code_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.trim().to_string();
    }
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// HTML instead of JSON usually means an error page was hit instead of the
/// API. Surface that as a protocol error rather than passing markup through.
pub(crate) fn reject_html(provider: ProviderId, text: &str) -> Result<(), GenerationError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('<') {
        return Err(GenerationError::Protocol {
            provider,
            message: "received HTML instead of JSON; check the API key and endpoint".to_string(),
        });
    }
    Ok(())
}

/// Shared guard for a non-empty assistant text.
pub(crate) fn non_empty(
    provider: ProviderId,
    text: Option<String>,
) -> Result<String, GenerationError> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(GenerationError::EmptyContent { provider })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn provider_id_round_trips_through_str() {
        for id in ProviderId::ALL {
            assert_eq!(ProviderId::from_str(id.as_str()).unwrap(), id);
        }
        assert!(ProviderId::from_str("copilot").is_err());
    }

    #[test]
    fn provider_id_serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderId::OpenRouter).unwrap(),
            "\"openrouter\""
        );
        let id: ProviderId = serde_json::from_str("\"claude\"").unwrap();
        assert_eq!(id, ProviderId::Claude);
    }

    #[test]
    fn wire_request_debug_hides_secrets() {
        let req = WireRequest {
            url: "https://example.test/v1/models/m:generateContent?key=sk-secret".to_string(),
            headers: vec![("Authorization", "Bearer sk-secret".to_string())],
            body: serde_json::json!({}),
        };
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("Authorization"));
    }

    #[test]
    fn strip_code_fences_handles_language_tags() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }
}
