//! Persistent key-value storage for chat history
//!
//! History is stored as one JSON document per key. Keys carry the schema
//! version (for example `thansin_chat_history_v2`), so a build with a new
//! history shape simply misses the old entry instead of failing to parse it.

use crate::error::{CompanionError, Result};
use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub mod memory;
pub use memory::MemoryStore;

/// Key-value store holding persisted session state
#[cfg_attr(test, mockall::automock)]
pub trait HistoryStore: Send + Sync {
    /// Reads the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed history store
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a new storage instance
    ///
    /// Initializes the database file in the user's data directory.
    pub fn new() -> Result<Self> {
        // Allow override of the history DB path via environment variable.
        if let Ok(override_path) = std::env::var("THANSIN_HISTORY_DB") {
            return Self::new_with_path(override_path);
        }

        let proj_dirs = ProjectDirs::from("com", "thansin", "thansin")
            .ok_or_else(|| CompanionError::Storage("Could not determine data directory".into()))?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .context("Failed to create data directory")
            .map_err(|e| CompanionError::Storage(e.to_string()))?;

        Self::new_with_path(data_dir.join("history.db"))
    }

    /// Create a new storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::storage::{HistoryStore, SqliteStorage};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let storage = SqliteStorage::new_with_path(dir.path().join("history.db")).unwrap();
    /// storage.set("greeting_v1", "[]").unwrap();
    /// assert_eq!(storage.get("greeting_v1").unwrap().as_deref(), Some("[]"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        // Ensure parent directory exists so opening the DB file succeeds.
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| CompanionError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| CompanionError::Storage(e.to_string()).into())
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| CompanionError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl HistoryStore for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.open()?;

        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("Failed to query history")
            .map_err(|e| CompanionError::Storage(e.to_string()))?;

        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.open()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .context("Failed to save history")
        .map_err(|e| CompanionError::Storage(e.to_string()))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.open()?;

        conn.execute("DELETE FROM kv_store WHERE key = ?", params![key])
            .context("Failed to delete history")
            .map_err(|e| CompanionError::Storage(e.to_string()))?;

        Ok(())
    }
}
