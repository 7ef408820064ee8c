//! pubquery binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Build the HTTP query client and the conversation orchestrator
//! 4. Run the interactive console until EOF or `/quit`

mod cli;
mod repl;
mod view;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pubquery_chat::{ConversationOrchestrator, HttpQueryService};
use pubquery_core::{PubqueryConfig, PubqueryError};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Tracing depends on the configured level, so the load outcome is
    // logged once the subscriber is up.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match PubqueryConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (PubqueryConfig::default(), Some(e)),
    };

    // Tracing. Log lines go to stderr so the console output stays readable.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting pubquery v{}", env!("CARGO_PKG_VERSION"));

    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(PubqueryError::Io(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %config_file.display(), "No configuration file, using defaults")
        }
        Some(e) => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load configuration, using defaults")
        }
    }

    config.general.log_level = log_level;
    config.service.base_url = args.resolve_backend_url(&config.service.base_url);

    if args.init_config {
        config.save(&config_file)?;
        println!("Wrote configuration to {}", config_file.display());
        return Ok(());
    }

    // Query client.
    let service = match HttpQueryService::new(&config.service) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(base_url = %config.service.base_url, error = %e, "Invalid backend configuration");
            return Err(e.into());
        }
    };
    tracing::info!(endpoint = service.endpoint(), "Query backend configured");

    let orchestrator = ConversationOrchestrator::new(Arc::new(service));

    repl::run(
        orchestrator,
        &config.service.base_url,
        config.conversation.max_message_length,
    )
    .await?;

    tracing::info!("Session ended");
    Ok(())
}
