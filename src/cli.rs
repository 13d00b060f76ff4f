//! Command-line interface definition for Thansin
//!
//! This module defines the CLI structure using clap's derive API.
//! Running without a subcommand starts the interactive chat.

use clap::{Parser, Subcommand};

/// Thansin - a chat companion in your terminal
///
/// Talk with the companion persona; history is kept between runs
/// until it is cleared.
#[derive(Parser, Debug, Clone)]
#[command(name = "thansin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the history database path
    #[arg(long, env = "THANSIN_HISTORY_DB")]
    pub storage_path: Option<String>,

    /// Do not regenerate the avatar from reply moods
    #[arg(long)]
    pub no_avatars: bool,

    /// Command to execute (defaults to `chat`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands for Thansin
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start the interactive chat
    Chat,

    /// Erase the persisted history and restore the greeting
    Clear,

    /// Print the persisted history without starting a chat
    History {
        /// Print turns as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The command to run, falling back to `chat`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Chat)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            storage_path: None,
            no_avatars: false,
            command: None,
        }
    }
}
