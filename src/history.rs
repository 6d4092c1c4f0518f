//! Bounded append-only log of past successful generations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;
use crate::store::StateStore;

/// Maximum number of retained entries; insertion evicts the oldest beyond
/// this bound.
pub const HISTORY_LIMIT: usize = 20;

/// One past generation. Never mutated after creation; removed only by
/// eviction or a full clear.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonic millisecond timestamp, unique across the list.
    pub id: u64,
    pub prompt: String,
    pub json: String,
    pub provider: ProviderId,
    pub timestamp: DateTime<Utc>,
}

/// History log backed by the external key-value store. Entries are kept
/// newest-first.
pub struct HistoryStore {
    store: Arc<dyn StateStore>,
    limit: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            limit: HISTORY_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Record a successful generation. Read-prepend-truncate-write; the
    /// final write is one atomic set.
    pub fn append(&self, prompt: &str, json: &str, provider: ProviderId) -> HistoryEntry {
        let mut entries = self.store.load_history();

        let now = Utc::now();
        let now_ms = now.timestamp_millis().max(0) as u64;
        // Clock reads can repeat within a millisecond; ids must not.
        let id = match entries.first() {
            Some(newest) => now_ms.max(newest.id + 1),
            None => now_ms,
        };

        let entry = HistoryEntry {
            id,
            prompt: prompt.to_string(),
            json: json.to_string(),
            provider,
            timestamp: now,
        };

        entries.insert(0, entry.clone());
        entries.truncate(self.limit);
        self.store.store_history(entries);

        entry
    }

    /// Entries as stored, newest-first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.store.load_history()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.store.store_history(Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn append_beyond_limit_evicts_oldest() {
        let history = history();
        for i in 0..25 {
            history.append(&format!("prompt {i}"), "{}", ProviderId::OpenAi);
        }

        let entries = history.list();
        assert_eq!(entries.len(), HISTORY_LIMIT);
        // Newest-first: the last appended prompt leads the list.
        assert_eq!(entries[0].prompt, "prompt 24");
        assert_eq!(entries[HISTORY_LIMIT - 1].prompt, "prompt 5");
    }

    #[test]
    fn ids_are_strictly_monotonic() {
        let history = history();
        for _ in 0..50 {
            history.append("p", "{}", ProviderId::Groq);
        }

        let entries = history.list();
        for pair in entries.windows(2) {
            assert!(pair[0].id > pair[1].id);
        }
    }

    #[test]
    fn clear_removes_everything() {
        let history = history();
        history.append("p", "{}", ProviderId::Claude);
        assert_eq!(history.list().len(), 1);
        history.clear();
        assert!(history.list().is_empty());
    }
}
