use std::collections::HashMap;

use crate::providers::claude::{self, ClaudeAdapter};
use crate::providers::gemini::{self, GeminiAdapter};
use crate::providers::grok::{self, GrokAdapter};
use crate::providers::groq::{self, GroqAdapter};
use crate::providers::mistral::{self, MistralAdapter};
use crate::providers::openai::{self, OpenAiAdapter};
use crate::providers::openrouter::{self, OpenRouterAdapter};
use crate::providers::{ProviderAdapter, ProviderId};

/// One registered provider: its display label, endpoint, and the adapter
/// that speaks its wire format. Adapters are defined once at registry
/// construction and never per request.
pub struct ProviderEntry {
    pub label: &'static str,
    pub base_url: String,
    adapter: Box<dyn ProviderAdapter>,
}

impl ProviderEntry {
    pub fn adapter(&self) -> &dyn ProviderAdapter {
        &*self.adapter
    }
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("label", &self.label)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Pure mapping from provider identifier to adapter functions. No state
/// beyond the (overridable) endpoint URLs, no I/O.
pub struct Registry {
    entries: HashMap<ProviderId, ProviderEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut entries: HashMap<ProviderId, ProviderEntry> = HashMap::new();

        entries.insert(
            ProviderId::OpenAi,
            ProviderEntry {
                label: "OpenAI (GPT)",
                base_url: openai::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(OpenAiAdapter),
            },
        );
        entries.insert(
            ProviderId::Gemini,
            ProviderEntry {
                label: "Google Gemini",
                base_url: gemini::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(GeminiAdapter),
            },
        );
        entries.insert(
            ProviderId::Mistral,
            ProviderEntry {
                label: "Mistral AI",
                base_url: mistral::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(MistralAdapter),
            },
        );
        entries.insert(
            ProviderId::Claude,
            ProviderEntry {
                label: "Anthropic (Claude)",
                base_url: claude::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(ClaudeAdapter),
            },
        );
        entries.insert(
            ProviderId::OpenRouter,
            ProviderEntry {
                label: "OpenRouter",
                base_url: openrouter::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(OpenRouterAdapter),
            },
        );
        entries.insert(
            ProviderId::Grok,
            ProviderEntry {
                label: "Grok (x.ai)",
                base_url: grok::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(GrokAdapter),
            },
        );
        entries.insert(
            ProviderId::Groq,
            ProviderEntry {
                label: "Groq",
                base_url: groq::DEFAULT_BASE_URL.to_string(),
                adapter: Box::new(GroqAdapter),
            },
        );

        Self { entries }
    }

    pub fn get(&self, id: ProviderId) -> Option<&ProviderEntry> {
        self.entries.get(&id)
    }

    pub fn list(&self) -> Vec<(ProviderId, &ProviderEntry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        entries
    }

    /// Point a provider at a different endpoint. Tests use this to aim
    /// adapters at a local mock server.
    pub fn with_base_url(mut self, id: ProviderId, base_url: impl Into<String>) -> Self {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.base_url = base_url.into();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_every_provider() {
        let registry = Registry::new();
        for id in ProviderId::ALL {
            let entry = registry.get(id).expect("provider registered");
            assert!(!entry.label.is_empty());
            assert!(entry.base_url.starts_with("https://"));
        }
    }

    #[test]
    fn base_url_override_applies() {
        let registry =
            Registry::new().with_base_url(ProviderId::OpenAi, "http://127.0.0.1:9999/v1");
        assert_eq!(
            registry.get(ProviderId::OpenAi).unwrap().base_url,
            "http://127.0.0.1:9999/v1"
        );
        // Other entries untouched
        assert!(registry
            .get(ProviderId::Groq)
            .unwrap()
            .base_url
            .contains("groq.com"));
    }
}
