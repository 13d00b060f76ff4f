//! Thansin - companion chat CLI
//!
#![doc = "Thansin - companion chat CLI"]
#![doc = "Main entry point for the Thansin application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use thansin::cli::{Cli, Commands};
use thansin::commands;
use thansin::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    tracing::debug!("Configuration loaded from {}", config_path);

    let storage_path = cli.storage_path.clone();

    match cli.command() {
        Commands::Chat => {
            commands::chat::run_chat(config, storage_path).await?;
            Ok(())
        }
        Commands::Clear => {
            tracing::info!("Clearing conversation history");
            commands::history::clear_history(&config, storage_path.as_deref())?;
            Ok(())
        }
        Commands::History { json } => {
            commands::history::print_history(&config, storage_path.as_deref(), json)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so the conversation on stdout stays readable.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "thansin=debug" } else { "thansin=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
