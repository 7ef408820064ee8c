//! Error types for the conversation engine.

/// Fallback text when a request-side failure carries no description.
pub const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Errors raised while wiring up the conversation engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid query endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// A failed query round-trip, classified by where it broke.
///
/// The `Display` text is what the conversation records as its last error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The backend answered with a non-success status.
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },
    /// The request went out but no response came back.
    #[error("Cannot connect to backend server. Make sure the backend is running at {backend}")]
    Connectivity { backend: String },
    /// The request could not be built or sent.
    #[error("{message}")]
    Request { message: String },
}

impl QueryError {
    /// Build a server error, preferring the server's detail over the status text.
    pub fn server(status: u16, detail: Option<String>, status_text: Option<&str>) -> Self {
        let detail = detail
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .or_else(|| status_text.map(str::to_string))
            .unwrap_or_else(|| "Unknown status".to_string());
        QueryError::Server { status, detail }
    }

    pub fn connectivity(backend: impl Into<String>) -> Self {
        QueryError::Connectivity {
            backend: backend.into(),
        }
    }

    /// Build a request-side error; an empty description becomes [`UNKNOWN_ERROR`].
    pub fn request(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR.to_string()
        } else {
            message
        };
        QueryError::Request { message }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Server { .. } => "server",
            QueryError::Connectivity { .. } => "connectivity",
            QueryError::Request { .. } => "request",
        }
    }
}
