//! Presentation summary of an assistant answer.

use crate::suggestions::{follow_ups, FollowUp};
use crate::types::Message;
use crate::visualization::{render, Rendering};

/// Everything a view needs to show one answer inline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSummary {
    pub sql: String,
    /// Row count and confidence line.
    pub caption: String,
    pub rendering: Rendering,
    pub follow_ups: Vec<FollowUp>,
}

impl ResponseSummary {
    /// Summarize an assistant message. `None` for messages without a response.
    pub fn for_message(message: &Message) -> Option<Self> {
        let response = message.response.as_ref()?;
        Some(Self {
            sql: response.sql.clone(),
            caption: response.caption(),
            rendering: render(&response.rows, &response.visualization),
            follow_ups: follow_ups(message),
        })
    }
}
