use thiserror::Error;

/// Top-level error type shared by the workspace crates.
///
/// Covers reading, parsing and writing the configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PubqueryError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PubqueryError {
    fn from(err: toml::de::Error) -> Self {
        PubqueryError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PubqueryError {
    fn from(err: toml::ser::Error) -> Self {
        PubqueryError::Config(err.to_string())
    }
}

/// A specialized `Result` type for workspace operations.
pub type Result<T> = std::result::Result<T, PubqueryError>;
