//! flowforge — generation orchestrator for workflow-automation documents.
//!
//! Turns a natural-language prompt into a JSON workflow document by calling
//! one of several third-party LLM chat APIs, repairing the free-form model
//! output into a JSON payload, and recording bounded history. The embedding
//! runtime drives the core through two calls ([`Orchestrator::start`],
//! [`Orchestrator::cancel`]) and observes two pieces of state (the persisted
//! outcome record and the history list) via a [`store::StateStore`].

pub mod config;
pub mod error;
pub mod extract;
pub mod history;
pub mod orchestrator;
pub mod providers;
pub mod retry;
pub mod store;
pub mod transport;

pub use config::OrchestratorConfig;
pub use error::{ErrorKind, GenerationError};
pub use extract::{extract_json, Extraction};
pub use history::{HistoryEntry, HistoryStore, HISTORY_LIMIT};
pub use orchestrator::{
    CancelReason, GenerationOutcome, GenerationRequest, Orchestrator, CANCELLED_BY_USER,
};
pub use providers::registry::Registry;
pub use providers::ProviderId;
pub use retry::{with_backoff, RetryPolicy};
pub use store::{MemoryStore, OutcomeState, StateStore};
