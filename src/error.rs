use thiserror::Error;

use crate::providers::ProviderId;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error from {provider}: {message}")]
    Transport {
        provider: ProviderId,
        message: String,
        status: Option<u16>,
    },

    #[error("protocol error from {provider}: {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },

    #[error("no content received from {provider}")]
    EmptyContent { provider: ProviderId },

    #[error("generation was cancelled")]
    Cancelled,

    #[error("provider still overloaded after {attempts} attempts")]
    StillOverloaded { attempts: u32 },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl GenerationError {
    /// Extract the provider from structured error variants.
    /// Returns None for variants that don't carry provider context.
    pub fn provider(&self) -> Option<ProviderId> {
        match self {
            Self::Transport { provider, .. } => Some(*provider),
            Self::Protocol { provider, .. } => Some(*provider),
            Self::EmptyContent { provider } => Some(*provider),
            _ => None,
        }
    }

    /// Returns true when the error signals an upstream capacity limit.
    /// Only these errors qualify for backoff-and-retry; everything else
    /// propagates immediately.
    pub fn is_overloaded(&self) -> bool {
        match self {
            Self::Transport { message, .. } | Self::Protocol { message, .. } => {
                message.to_ascii_lowercase().contains("overloaded")
            }
            _ => false,
        }
    }

    /// Produce a display message safe for persisting to shared state.
    /// Long provider error bodies are reduced to a single sentence.
    pub fn user_message(&self) -> String {
        match self {
            Self::Configuration(msg) => msg.clone(),
            Self::Transport {
                provider,
                message,
                status,
            } => match status {
                Some(code) => format!(
                    "API error from {provider}: {code} - {}",
                    single_sentence(message)
                ),
                None => format!("API error from {provider}: {}", single_sentence(message)),
            },
            Self::Protocol { provider, message } => {
                format!(
                    "{provider} returned an unexpected response: {}",
                    single_sentence(message)
                )
            }
            Self::EmptyContent { provider } => format!(
                "No content received from {provider}. Response structure may have changed."
            ),
            Self::Cancelled => "Generation was cancelled by user.".to_string(),
            Self::StillOverloaded { attempts } => format!(
                "API still overloaded after {attempts} retries. Please try again later."
            ),
            Self::Request(_) => "Network request to provider failed.".to_string(),
        }
    }

    /// Stable tag for the error class, used in persisted failure payloads.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Transport { .. } | Self::Request(_) | Self::StillOverloaded { .. } => {
                ErrorKind::Transport
            }
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::EmptyContent { .. } => ErrorKind::Content,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Transport,
    Protocol,
    Content,
    Cancelled,
}

/// Reduce a provider error body to its first sentence. Falls back to the
/// first line, then the trimmed input, so the result is never empty for
/// non-empty input.
pub fn single_sentence(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let end = trimmed.char_indices().find_map(|(i, c)| match c {
        '.' | '!' | '?' => Some(i + c.len_utf8()),
        '\n' | '\r' => Some(i),
        _ => None,
    });

    match end {
        Some(i) if i > 0 => trimmed[..i].trim().to_string(),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_sentence_stops_at_period() {
        assert_eq!(
            single_sentence("Rate limit exceeded. Retry after 60 seconds."),
            "Rate limit exceeded."
        );
    }

    #[test]
    fn single_sentence_stops_at_newline() {
        assert_eq!(single_sentence("first line\nsecond line"), "first line");
    }

    #[test]
    fn single_sentence_passes_short_text_through() {
        assert_eq!(single_sentence("  invalid api key  "), "invalid api key");
        assert_eq!(single_sentence(""), "");
    }

    #[test]
    fn overloaded_detection_is_case_insensitive() {
        let err = GenerationError::Transport {
            provider: ProviderId::Claude,
            message: "529: Overloaded".to_string(),
            status: Some(529),
        };
        assert!(err.is_overloaded());

        let err = GenerationError::Transport {
            provider: ProviderId::Claude,
            message: "500: internal error".to_string(),
            status: Some(500),
        };
        assert!(!err.is_overloaded());
    }
}
