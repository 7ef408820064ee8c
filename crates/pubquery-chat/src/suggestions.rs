//! Follow-up question surfacing.
//!
//! A pure projection of an assistant message's suggested questions. Each
//! entry, once activated, is submitted exactly as if the user had typed it.

use serde::Serialize;

use crate::types::Message;

/// One clickable follow-up question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    /// Zero-based position in the order received.
    pub index: usize,
    pub question: String,
}

/// Follow-ups offered by `message`, in the order the backend sent them.
///
/// Empty for user messages and for answers without suggestions. No dedup,
/// no ranking.
pub fn follow_ups(message: &Message) -> Vec<FollowUp> {
    message
        .response
        .as_ref()
        .map(|response| {
            response
                .suggested_questions
                .iter()
                .enumerate()
                .map(|(index, question)| FollowUp {
                    index,
                    question: question.clone(),
                })
                .collect()
        })
        .unwrap_or_default()
}
