//! Conversation store: message history plus request lifecycle.
//!
//! Every mutator is synchronous and leaves the store consistent: an error
//! message is recorded exactly when the phase is [`Phase::Error`].

use uuid::Uuid;

use crate::types::{ConversationState, Message, Phase, QueryResponse};

/// Message recorded when the phase moves to error without a description.
pub const GENERIC_ERROR: &str = "Failed to process query";

/// Lifecycle with the error text attached to the error state itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
enum Lifecycle {
    #[default]
    Idle,
    Loading,
    Failed(String),
}

/// Ordered message history and request lifecycle of one session.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    lifecycle: Lifecycle,
    /// Bumped by every [`ConversationStore::clear`].
    epoch: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Mutators --

    /// Append a user message with a fresh id and the current time.
    pub fn append_user_message(&mut self, text: impl Into<String>) -> &Message {
        self.push(Message::user(text.into()))
    }

    /// Append an assistant message wrapping `response`.
    pub fn append_assistant_message(&mut self, response: QueryResponse) -> &Message {
        self.push(Message::assistant(response))
    }

    /// Move to `phase`.
    ///
    /// Entering [`Phase::Error`] keeps an already recorded error or records
    /// [`GENERIC_ERROR`]. Any other phase drops the recorded error.
    pub fn set_phase(&mut self, phase: Phase) {
        self.lifecycle = match (phase, std::mem::take(&mut self.lifecycle)) {
            (Phase::Idle, _) => Lifecycle::Idle,
            (Phase::Loading, _) => Lifecycle::Loading,
            (Phase::Error, Lifecycle::Failed(message)) => Lifecycle::Failed(message),
            (Phase::Error, _) => {
                tracing::warn!("Error phase set without a message, using generic text");
                Lifecycle::Failed(GENERIC_ERROR.to_string())
            }
        };
    }

    /// Record or drop the last error.
    ///
    /// A non-blank message moves the store to [`Phase::Error`]. `None` (or a
    /// blank message) drops the error and returns an errored store to idle.
    pub fn set_error(&mut self, message: Option<String>) {
        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        match message {
            Some(message) => self.lifecycle = Lifecycle::Failed(message),
            None => {
                if matches!(self.lifecycle, Lifecycle::Failed(_)) {
                    self.lifecycle = Lifecycle::Idle;
                }
            }
        }
    }

    /// Drop all messages and return to idle with no error.
    pub fn clear(&mut self) {
        let dropped = self.messages.len();
        self.messages.clear();
        self.lifecycle = Lifecycle::Idle;
        self.epoch += 1;
        tracing::debug!(dropped, epoch = self.epoch, "Conversation cleared");
    }

    // -- Read access --

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Most recent assistant message, if any.
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| !m.is_user())
    }

    pub fn phase(&self) -> Phase {
        match self.lifecycle {
            Lifecycle::Idle => Phase::Idle,
            Lifecycle::Loading => Phase::Loading,
            Lifecycle::Failed(_) => Phase::Error,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match &self.lifecycle {
            Lifecycle::Failed(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lifecycle == Lifecycle::Loading
    }

    /// Number of times the store has been cleared.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> ConversationState {
        ConversationState {
            messages: self.messages.clone(),
            phase: self.phase(),
            last_error: self.last_error().map(str::to_string),
        }
    }

    // -- Private helpers --

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

// =============================================================================
// Tests
// =============================================================================
