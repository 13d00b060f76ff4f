/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    - Interactive chat with the companion
- `history` - Print or clear the persisted history

Handlers are small and wire together the library components: storage,
session, provider handle and dispatcher.
*/

use crate::agent::placeholder_avatar;
use crate::config::Config;
use crate::error::Result;
use crate::persona::PersonaConfig;
use crate::session::{AvatarState, SessionManager, Speaker, Turn};
use crate::storage::{HistoryStore, SqliteStorage};
use colored::Colorize;
use std::sync::Arc;

pub mod chat;
pub mod history;

/// Opens the SQLite history store
///
/// `storage_path` wins over `THANSIN_HISTORY_DB` and the default data
/// directory.
///
/// # Errors
///
/// Returns error if the database cannot be created or opened
pub fn open_store(storage_path: Option<&str>) -> Result<Arc<dyn HistoryStore>> {
    let storage = match storage_path {
        Some(path) => SqliteStorage::new_with_path(path)?,
        None => SqliteStorage::new()?,
    };
    tracing::debug!("Using history database at {}", storage.path().display());
    Ok(Arc::new(storage))
}

/// Builds a session over `store` using the configured key and persona
pub fn build_session(config: &Config, store: Arc<dyn HistoryStore>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        store,
        config.session.storage_key.clone(),
        config.persona.greeting.clone(),
        AvatarState::new(placeholder_avatar(&config.persona.default_mood)),
    ))
}

/// Formats one turn for the terminal
pub fn format_turn(turn: &Turn, persona: &PersonaConfig) -> String {
    match turn.speaker() {
        Speaker::User => format!("{} {}", "You:".cyan().bold(), turn.text()),
        Speaker::Companion if turn.is_error() => format!(
            "{} {}",
            format!("{}:", persona.display_name).red().bold(),
            turn.text().red()
        ),
        Speaker::Companion => format!(
            "{} {}",
            format!("{}:", persona.display_name).magenta().bold(),
            turn.text()
        ),
    }
}

/// Shortens an avatar reference for display
///
/// Inline `data:` images are summarized by MIME type and size.
pub fn describe_avatar(reference: &str) -> String {
    match reference.strip_prefix("data:") {
        Some(rest) => {
            let mime = rest.split(';').next().unwrap_or("image");
            let encoded_len = rest.split(',').nth(1).map(str::len).unwrap_or(0);
            format!("{} ({} KB inline)", mime, encoded_len * 3 / 4 / 1024)
        }
        None => reference.to_string(),
    }
}
