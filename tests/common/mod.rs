use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use thansin::agent::placeholder_avatar;
use thansin::error::{CompanionError, Result};
use thansin::providers::{GenerationConfig, Message, Provider};
use thansin::session::{AvatarState, SessionManager};
use thansin::storage::{HistoryStore, SqliteStorage};

#[allow(dead_code)]
pub const STORAGE_KEY: &str = "thansin_chat_history_v2";
#[allow(dead_code)]
pub const GREETING: &str = "မောင်... ရောက်လာပြီလား?";

#[allow(dead_code)]
pub fn create_temp_storage() -> (Arc<SqliteStorage>, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let db_path = tmp.path().join("history.db");
    let storage =
        SqliteStorage::new_with_path(db_path).expect("failed to create sqlite storage with path");
    (Arc::new(storage), tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn session_over(store: Arc<dyn HistoryStore>) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        store,
        STORAGE_KEY,
        GREETING,
        AvatarState::new(placeholder_avatar("happy")),
    ))
}

/// Provider answering from a queue of canned outcomes
#[allow(dead_code)]
pub struct FakeProvider {
    outcomes: Mutex<VecDeque<std::result::Result<String, CompanionError>>>,
    pub seen: Mutex<Vec<Vec<Message>>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(outcomes: Vec<std::result::Result<&str, CompanionError>>) -> Self {
        Self {
            outcomes: Mutex::new(
                outcomes
                    .into_iter()
                    .map(|o| o.map(str::to_string))
                    .collect(),
            ),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn complete(&self, messages: &[Message], _config: &GenerationConfig) -> Result<String> {
        self.seen.lock().unwrap().push(messages.to_vec());
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(e.into()),
            None => Ok(String::new()),
        }
    }
}
