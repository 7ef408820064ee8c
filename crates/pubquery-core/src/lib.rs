pub mod config;
pub mod error;

pub use config::PubqueryConfig;
pub use error::{PubqueryError, Result};
