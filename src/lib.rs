//! Thansin - companion chat library
//!
//! This library provides the core of the Thansin companion chat: session
//! state and persistence, turn dispatch with mood parsing and avatar refresh,
//! failure classification, the Gemini provider and configuration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Turn history, avatar state and change notifications
//! - `agent`: Turn dispatcher, mood parsing, failure classifier, avatar refresher
//! - `providers`: Generation provider abstraction and the Gemini implementation
//! - `storage`: Key-value history stores (SQLite and in-memory)
//! - `persona`: Persona configuration (instruction, greeting, failure texts)
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use thansin::agent::TurnDispatcher;
//! use thansin::providers::ProviderHandle;
//! use thansin::session::{AvatarState, SessionManager};
//! use thansin::storage::MemoryStore;
//! use thansin::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let session = Arc::new(SessionManager::new(
//!         Arc::new(MemoryStore::new()),
//!         config.session.storage_key.clone(),
//!         config.persona.greeting.clone(),
//!         AvatarState::new(thansin::agent::placeholder_avatar("happy")),
//!     ));
//!     session.load_or_init();
//!
//!     let provider = Arc::new(ProviderHandle::from_config(config.provider.clone()));
//!     let dispatcher = TurnDispatcher::from_config(&config, session, provider);
//!     dispatcher.send("မင်္ဂလာပါ").await;
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod persona;
pub mod providers;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use agent::{SendOutcome, TurnDispatcher};
pub use config::Config;
pub use error::{CompanionError, Result};
pub use session::{SessionManager, Turn};

#[cfg(test)]
pub mod test_utils;
