//! Conversation engine for the publication query console.
//!
//! Tracks message history and request lifecycle, drives one query round-trip
//! at a time against the query backend, and maps the loosely-typed
//! visualization descriptor of each answer onto a concrete chart rendering.

pub mod error;
pub mod orchestrator;
pub mod service;
pub mod store;
pub mod suggestions;
pub mod summary;
pub mod types;
pub mod visualization;

pub use error::{ChatError, QueryError};
pub use orchestrator::{ConversationOrchestrator, IgnoreReason, Submission};
pub use service::{HttpQueryService, QueryService};
pub use store::ConversationStore;
pub use suggestions::{follow_ups, FollowUp};
pub use summary::ResponseSummary;
pub use types::{
    ChartKind, ConversationState, Message, Phase, QueryResponse, Role, Row, SeriesSpec,
    VisualizationSpec,
};
pub use visualization::{render, Chart, Rendering, TableView};
