//! Key-value persistence boundary.
//!
//! The embedding runtime (a browser-extension background process in the
//! original deployment) owns real persistence; the core only requires
//! atomic reads and writes of two values: the generation outcome record and
//! the history list. [`MemoryStore`] is the in-process implementation used
//! by tests and as a default.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::history::HistoryEntry;

/// The persisted generation status record. Written only as a whole, never
/// field by field, so observers can never read `complete: true` with a
/// stale payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeState {
    #[serde(rename = "generationInProgress")]
    pub in_progress: bool,
    #[serde(rename = "generationComplete")]
    pub complete: bool,
    #[serde(rename = "generatedJson")]
    pub json: Option<String>,
    #[serde(rename = "generationError")]
    pub error: Option<String>,
}

impl OutcomeState {
    pub fn in_progress() -> Self {
        Self {
            in_progress: true,
            complete: false,
            json: None,
            error: None,
        }
    }

    pub fn succeeded(json: String) -> Self {
        Self {
            in_progress: false,
            complete: true,
            json: Some(json),
            error: None,
        }
    }

    pub fn failed(message: String) -> Self {
        Self {
            in_progress: false,
            complete: true,
            json: None,
            error: Some(message),
        }
    }
}

/// Atomic key-value persistence the embedding runtime must provide.
/// Each method is one atomic operation; the core never issues partial
/// multi-key writes.
pub trait StateStore: Send + Sync {
    fn load_outcome(&self) -> OutcomeState;
    fn store_outcome(&self, state: OutcomeState);
    fn load_history(&self) -> Vec<HistoryEntry>;
    fn store_history(&self, entries: Vec<HistoryEntry>);
}

struct Inner {
    outcome: OutcomeState,
    history: Vec<HistoryEntry>,
}

/// In-process store with a change-notification stream for the outcome
/// record, mirroring the storage-change events of the original runtime.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    outcome_tx: watch::Sender<OutcomeState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (outcome_tx, _) = watch::channel(OutcomeState::default());
        Self {
            inner: Mutex::new(Inner {
                outcome: OutcomeState::default(),
                history: Vec::new(),
            }),
            outcome_tx,
        }
    }

    /// Subscribe to outcome changes. Each atomic write is observed as one
    /// complete record.
    pub fn subscribe(&self) -> watch::Receiver<OutcomeState> {
        self.outcome_tx.subscribe()
    }
}

impl StateStore for MemoryStore {
    fn load_outcome(&self) -> OutcomeState {
        self.inner.lock().expect("state store poisoned").outcome.clone()
    }

    fn store_outcome(&self, state: OutcomeState) {
        {
            let mut inner = self.inner.lock().expect("state store poisoned");
            inner.outcome = state.clone();
        }
        // Receivers may all be gone; that's fine.
        let _ = self.outcome_tx.send(state);
    }

    fn load_history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().expect("state store poisoned").history.clone()
    }

    fn store_history(&self, entries: Vec<HistoryEntry>) {
        self.inner.lock().expect("state store poisoned").history = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_writes_are_observed_whole() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.store_outcome(OutcomeState::succeeded("{\"nodes\":[]}".to_string()));

        let seen = rx.borrow_and_update().clone();
        assert!(seen.complete);
        assert!(!seen.in_progress);
        assert_eq!(seen.json.as_deref(), Some("{\"nodes\":[]}"));
        assert_eq!(seen.error, None);
    }

    #[test]
    fn outcome_serializes_under_storage_key_names() {
        let value = serde_json::to_value(OutcomeState::in_progress()).expect("serializes");
        assert_eq!(value["generationInProgress"], true);
        assert_eq!(value["generationComplete"], false);
        assert_eq!(value["generatedJson"], serde_json::Value::Null);
        assert_eq!(value["generationError"], serde_json::Value::Null);
    }

    #[test]
    fn terminal_states_clear_the_in_progress_flag() {
        assert!(!OutcomeState::succeeded(String::new()).in_progress);
        assert!(!OutcomeState::failed("boom".to_string()).in_progress);
        assert!(OutcomeState::in_progress().in_progress);
    }
}
