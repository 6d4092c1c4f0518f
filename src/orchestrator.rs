//! The generation state machine: `Idle → InProgress → {Succeeded, Failed,
//! Cancelled}`.
//!
//! At most one request is logically current at a time. A second `start`
//! while one is in flight cancels and replaces it: the superseded task
//! observes a newer sequence number at finalization and skips persistence,
//! so "latest wins" is an explicit transition rather than a write race.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::error::{ErrorKind, GenerationError};
use crate::extract::{extract_json, Extraction};
use crate::history::HistoryStore;
use crate::providers::registry::Registry;
use crate::providers::ProviderId;
use crate::store::{OutcomeState, StateStore};
use crate::transport::HttpTransport;

pub const CANCELLED_BY_USER: &str = "Generation was cancelled by user.";

/// One generation request. The API key is a secret: it never appears in
/// logs or Debug output.
#[derive(Clone)]
pub struct GenerationRequest {
    pub provider: ProviderId,
    pub model: String,
    pub api_key: String,
    pub user_prompt: String,
    pub system_prompt: String,
}

impl std::fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("user_prompt", &self.user_prompt)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    User,
    Timeout,
}

/// Terminal result of one request. Produced exactly once; also persisted
/// to the state store, so callers may ignore the return value and watch
/// the store instead.
#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome {
    Succeeded {
        json: String,
        /// False when the extractor returned best-effort text that did not
        /// parse cleanly. The document may still be usable.
        parsed_clean: bool,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
    Cancelled {
        reason: CancelReason,
    },
}

/// The single live cancellation handle plus the sequence number that
/// identifies which `start` call owns it.
struct InFlight {
    token: CancellationToken,
    seq: u64,
}

pub struct Orchestrator {
    registry: Registry,
    transport: HttpTransport,
    store: Arc<dyn StateStore>,
    history: HistoryStore,
    config: OrchestratorConfig,
    /// The only mutable shared state in the core. Non-empty exactly while
    /// a request is in progress; cleared on every terminal transition.
    current: Mutex<Option<InFlight>>,
    seq: AtomicU64,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            registry: Registry::new(),
            transport: HttpTransport::new(),
            history: HistoryStore::new(store.clone()).with_limit(config.history_limit),
            store,
            config,
            current: Mutex::new(None),
            seq: AtomicU64::new(0),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.history = HistoryStore::new(self.store.clone()).with_limit(config.history_limit);
        self.config = config;
        self
    }

    /// Replace the default registry, e.g. to point providers at a mock
    /// endpoint.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// True while a request is in flight.
    pub fn is_in_progress(&self) -> bool {
        self.current.lock().expect("in-flight lock poisoned").is_some()
    }

    /// Run one generation to a terminal outcome. Never returns `Err`: every
    /// failure mode is folded into the outcome and persisted, so the
    /// embedding layer can render status without its own error handling.
    pub async fn start(&self, request: GenerationRequest) -> GenerationOutcome {
        if let Err(err) = self.validate(&request) {
            // Configuration failures never touch the network and never
            // supersede a running request. The persisted record belongs to
            // the in-flight generation if there is one, so only write it
            // when idle.
            let message = err.user_message();
            let idle = self
                .current
                .lock()
                .expect("in-flight lock poisoned")
                .is_none();
            if idle {
                self.store.store_outcome(OutcomeState::failed(message.clone()));
            }
            return GenerationOutcome::Failed {
                kind: err.kind(),
                message,
            };
        }

        let token = CancellationToken::new();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        {
            let mut current = self.current.lock().expect("in-flight lock poisoned");
            if let Some(previous) = current.take() {
                tracing::warn!(
                    provider = %request.provider,
                    "superseding in-flight generation"
                );
                previous.token.cancel();
            }
            *current = Some(InFlight {
                token: token.clone(),
                seq,
            });
        }

        self.store.store_outcome(OutcomeState::in_progress());
        tracing::info!(
            provider = %request.provider,
            model = %request.model,
            "generation started"
        );

        let outcome = tokio::select! {
            _ = token.cancelled() => GenerationOutcome::Cancelled {
                reason: CancelReason::User,
            },
            _ = tokio::time::sleep(self.config.request_timeout) => {
                // The timer fires the same abort mechanism as manual cancel.
                token.cancel();
                GenerationOutcome::Cancelled {
                    reason: CancelReason::Timeout,
                }
            }
            result = self.execute(&request) => match result {
                Ok(extraction) => GenerationOutcome::Succeeded {
                    parsed_clean: extraction.is_parsed(),
                    json: extraction.into_text(),
                },
                Err(GenerationError::Cancelled) => GenerationOutcome::Cancelled {
                    reason: CancelReason::User,
                },
                Err(err) => GenerationOutcome::Failed {
                    kind: err.kind(),
                    message: err.user_message(),
                },
            },
        };

        self.finalize(seq, &request, outcome)
    }

    /// Cancel the in-flight request, if any. Cancelling when idle is a
    /// no-op that still acknowledges success; the persisted cancelled
    /// outcome is written by the request task itself as it unwinds.
    pub fn cancel(&self) -> bool {
        let current = self.current.lock().expect("in-flight lock poisoned");
        if let Some(inflight) = current.as_ref() {
            tracing::info!("cancellation requested");
            inflight.token.cancel();
        }
        true
    }

    fn validate(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        if self.registry.get(request.provider).is_none() {
            return Err(GenerationError::Configuration(format!(
                "provider not registered: {}",
                request.provider
            )));
        }
        for (field, value) in [
            ("model", &request.model),
            ("apiKey", &request.api_key),
            ("userPrompt", &request.user_prompt),
            ("systemPrompt", &request.system_prompt),
        ] {
            if value.trim().is_empty() {
                return Err(GenerationError::Configuration(format!(
                    "missing required field: {field}"
                )));
            }
        }
        Ok(())
    }

    /// Network + parse + extract, without timeout/cancel concerns — the
    /// caller races this against the in-flight token.
    async fn execute(&self, request: &GenerationRequest) -> Result<Extraction, GenerationError> {
        let entry = self.registry.get(request.provider).ok_or_else(|| {
            GenerationError::Configuration(format!(
                "provider not registered: {}",
                request.provider
            ))
        })?;

        let wire = entry.adapter().build_request(
            &entry.base_url,
            &request.api_key,
            &request.model,
            &request.system_prompt,
            &request.user_prompt,
        );
        tracing::debug!(provider = %request.provider, request = ?wire, "dispatching");

        let body = crate::retry::with_backoff(
            || self.transport.execute(request.provider, &wire),
            &self.config.retry,
        )
        .await?;

        let text = entry.adapter().parse_response(&body)?;

        let extraction = extract_json(&text);
        if extraction.text().is_empty() {
            return Err(GenerationError::EmptyContent {
                provider: request.provider,
            });
        }
        Ok(extraction)
    }

    /// Persist the terminal outcome and clear the handle — unless a newer
    /// request superseded this one, in which case the outcome is returned
    /// to the caller but shared state is left alone.
    fn finalize(
        &self,
        seq: u64,
        request: &GenerationRequest,
        outcome: GenerationOutcome,
    ) -> GenerationOutcome {
        let still_current = {
            let mut current = self.current.lock().expect("in-flight lock poisoned");
            match current.as_ref() {
                Some(inflight) if inflight.seq == seq => {
                    *current = None;
                    true
                }
                _ => false,
            }
        };

        if !still_current {
            tracing::debug!(seq, "superseded generation finished; not persisted");
            return outcome;
        }

        match &outcome {
            GenerationOutcome::Succeeded { json, parsed_clean } => {
                if !*parsed_clean {
                    tracing::warn!(
                        provider = %request.provider,
                        "generated document did not parse cleanly; storing best-effort text"
                    );
                }
                self.history
                    .append(&request.user_prompt, json, request.provider);
                self.store.store_outcome(OutcomeState::succeeded(json.clone()));
                tracing::info!(provider = %request.provider, "generation succeeded");
            }
            GenerationOutcome::Failed { kind, message } => {
                self.store.store_outcome(OutcomeState::failed(message.clone()));
                tracing::warn!(provider = %request.provider, ?kind, %message, "generation failed");
            }
            GenerationOutcome::Cancelled { reason } => {
                let message = match reason {
                    CancelReason::User => CANCELLED_BY_USER.to_string(),
                    CancelReason::Timeout => format!(
                        "Generation timed out after {} seconds.",
                        self.config.request_timeout.as_secs()
                    ),
                };
                self.store.store_outcome(OutcomeState::failed(message));
                tracing::info!(provider = %request.provider, ?reason, "generation cancelled");
            }
        }

        outcome
    }
}
