//! Conversation orchestrator: drives one query round-trip at a time.
//!
//! Owns a shared handle to the [`ConversationStore`] and the [`QueryService`].
//! The store lock is only taken for synchronous steps and is never held while
//! the service call is outstanding.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use uuid::Uuid;

use crate::service::QueryService;
use crate::store::ConversationStore;
use crate::types::{ConversationState, Phase};

/// Why a submission was dropped without touching the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Blank after trimming.
    Empty,
    /// A query is already in flight.
    Busy,
}

/// Outcome of [`ConversationOrchestrator::submit_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Ignored(IgnoreReason),
    /// The answer was appended as an assistant message.
    Answered { message_id: Uuid },
    /// The query failed; `error` is the recorded last error.
    Failed { error: String },
    /// The conversation was cleared while the query was in flight.
    Discarded,
}

/// Coordinates the store and the query service for one session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    store: Arc<Mutex<ConversationStore>>,
    service: Arc<dyn QueryService>,
}

impl ConversationOrchestrator {
    /// Start a session with an empty conversation.
    pub fn new(service: Arc<dyn QueryService>) -> Self {
        Self::from_parts(ConversationStore::new(), service)
    }

    /// Start a session over an existing store.
    pub fn from_parts(store: ConversationStore, service: Arc<dyn QueryService>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            service,
        }
    }

    /// Submit a question.
    ///
    /// Blank input and input arriving while another query is in flight are
    /// ignored without any state change. Otherwise the trimmed text is
    /// appended as a user message, the conversation enters the loading phase,
    /// and the outcome of the service call is recorded. A failure keeps the
    /// user message and records a classified error.
    pub async fn submit_query(&self, raw_text: &str) -> Submission {
        let text = raw_text.trim();
        if text.is_empty() {
            return Submission::Ignored(IgnoreReason::Empty);
        }

        // Guard and transition under one lock acquisition.
        let epoch = {
            let mut store = self.lock();
            if store.is_loading() {
                tracing::debug!("Query already in flight, ignoring submission");
                return Submission::Ignored(IgnoreReason::Busy);
            }
            store.append_user_message(text);
            store.set_phase(Phase::Loading);
            store.epoch()
        };

        tracing::info!(query_len = text.len(), "Submitting query");
        let started = Instant::now();
        let result = self.service.query(text).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut store = self.lock();
        if store.epoch() != epoch {
            tracing::info!(elapsed_ms, "Conversation cleared during query, discarding result");
            return Submission::Discarded;
        }

        match result {
            Ok(response) => {
                let row_count = response.row_count;
                let message_id = store.append_assistant_message(response).id;
                store.set_phase(Phase::Idle);
                tracing::info!(elapsed_ms, row_count, "Query answered");
                Submission::Answered { message_id }
            }
            Err(err) => {
                let error = err.to_string();
                tracing::warn!(elapsed_ms, kind = err.kind(), error = %error, "Query failed");
                store.set_error(Some(error.clone()));
                store.set_phase(Phase::Error);
                Submission::Failed { error }
            }
        }
    }

    /// Submit a suggested follow-up question.
    pub async fn submit_follow_up(&self, question: &str) -> Submission {
        self.submit_query(question).await
    }

    /// Drop the history and return to idle.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn snapshot(&self) -> ConversationState {
        self.lock().snapshot()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    /// Run `f` with read access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&ConversationStore) -> R) -> R {
        f(&self.lock())
    }

    // -- Private helpers --

    /// Every store mutator leaves the store consistent, so a poisoned lock
    /// still guards valid state.
    fn lock(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// Tests
// =============================================================================
