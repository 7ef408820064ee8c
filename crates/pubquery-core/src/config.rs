use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// Top-level configuration for the query console.
///
/// Loaded from `~/.pubquery/config.toml` by default. Every section falls back
/// to its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PubqueryConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl PubqueryConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PubqueryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Query backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the query backend, without a trailing path.
    pub base_url: String,
    /// Path of the natural-language query endpoint.
    pub query_path: String,
    /// Transport timeout for one query. Zero disables it.
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            query_path: "/api/mcp/query".to_string(),
            timeout_secs: 60,
        }
    }
}

impl ServiceConfig {
    /// Full URL of the query endpoint.
    pub fn query_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.query_path.trim();
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Conversation input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Longest accepted question, in characters.
    pub max_message_length: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
        }
    }
}
