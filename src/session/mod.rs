//! Session state: turn history, avatar state and persistence
//!
//! [`SessionManager`] is the only owner of the turn sequence and the avatar.
//! Every mutation goes through it so the persisted copy and the change
//! notifications stay in step with the in-memory history.

pub mod turn;

pub use turn::{ErrorKind, Speaker, Turn};

use crate::storage::HistoryStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Capacity of the change notification channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Avatar shown next to companion turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarState {
    /// Image URL or `data:` URL
    pub reference: String,
    /// Whether a regeneration request is outstanding
    pub regenerating: bool,
}

impl AvatarState {
    /// Creates an idle avatar showing `reference`
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            regenerating: false,
        }
    }
}

/// Change notifications for front ends
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// History was replaced at start-up; `restored` is false for the greeting state
    Loaded {
        /// Whether a persisted history was used
        restored: bool,
    },
    /// A turn was appended
    TurnAppended(Turn),
    /// History was reset to the greeting
    Cleared,
    /// Avatar reference or regenerating flag changed
    AvatarChanged(AvatarState),
}

#[derive(Debug)]
struct SessionState {
    turns: Vec<Turn>,
    avatar: AvatarState,
}

/// Owner of the turn history and avatar state
pub struct SessionManager {
    store: Arc<dyn HistoryStore>,
    storage_key: String,
    greeting: String,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Creates a session holding only the greeting turn
    ///
    /// Nothing is read from or written to `store` until
    /// [`SessionManager::load_or_init`] or the first mutation.
    pub fn new(
        store: Arc<dyn HistoryStore>,
        storage_key: impl Into<String>,
        greeting: impl Into<String>,
        avatar: AvatarState,
    ) -> Self {
        let greeting = greeting.into();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            storage_key: storage_key.into(),
            state: Mutex::new(SessionState {
                turns: vec![Turn::companion(greeting.clone())],
                avatar,
            }),
            greeting,
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is rendering.
        let _ = self.events.send(event);
    }

    /// Subscribes to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Storage key the history is persisted under
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Restores the persisted history, or installs the greeting
    ///
    /// A missing, unreadable, unparseable or empty entry all mean "no prior
    /// state". The greeting is not written back until the next mutation.
    /// Returns whether a persisted history was restored.
    pub fn load_or_init(&self) -> bool {
        let restored = match self.store.get(&self.storage_key) {
            Ok(Some(raw)) => {
                let decoded = decode_history(&raw);
                if decoded.is_none() {
                    tracing::warn!(
                        "Persisted history under {} is unreadable, starting fresh",
                        self.storage_key
                    );
                }
                decoded
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read persisted history: {:#}", e);
                None
            }
        };

        let was_restored = restored.is_some();
        {
            let mut state = self.state();
            state.turns = restored.unwrap_or_else(|| vec![Turn::companion(self.greeting.clone())]);
            tracing::info!(
                "Session loaded: {} turns (restored={})",
                state.turns.len(),
                was_restored
            );
        }

        self.emit(SessionEvent::Loaded {
            restored: was_restored,
        });
        was_restored
    }

    /// Appends a turn and persists the full history
    ///
    /// A failed write is logged and otherwise ignored: the in-memory history
    /// stays authoritative for the running session.
    pub fn append(&self, turn: Turn) {
        {
            let mut state = self.state();
            state.turns.push(turn.clone());
            self.persist(&state.turns);
        }
        self.emit(SessionEvent::TurnAppended(turn));
    }

    fn persist(&self, turns: &[Turn]) {
        let encoded = match serde_json::to_string(turns) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("Failed to serialize history: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(&self.storage_key, &encoded) {
            tracing::warn!("Failed to persist history: {:#}", e);
        }
    }

    /// Resets history to the greeting and erases the persisted entry
    pub fn clear(&self) {
        {
            let mut state = self.state();
            state.turns = vec![Turn::companion(self.greeting.clone())];
            if let Err(e) = self.store.remove(&self.storage_key) {
                tracing::warn!("Failed to erase persisted history: {:#}", e);
            }
        }
        tracing::info!("Session cleared");
        self.emit(SessionEvent::Cleared);
    }

    /// Snapshot of the turn history
    pub fn turns(&self) -> Vec<Turn> {
        self.state().turns.clone()
    }

    /// Number of turns in the history
    pub fn len(&self) -> usize {
        self.state().turns.len()
    }

    /// Whether the history is empty (never true after construction)
    pub fn is_empty(&self) -> bool {
        self.state().turns.is_empty()
    }

    /// Snapshot of the avatar state
    pub fn avatar(&self) -> AvatarState {
        self.state().avatar.clone()
    }

    /// Replaces the avatar image
    pub fn set_avatar(&self, reference: impl Into<String>) {
        let avatar = {
            let mut state = self.state();
            state.avatar.reference = reference.into();
            state.avatar.clone()
        };
        self.emit(SessionEvent::AvatarChanged(avatar));
    }

    /// Installs a finished avatar and clears the regenerating flag
    pub fn apply_avatar(&self, reference: impl Into<String>) {
        let avatar = {
            let mut state = self.state();
            state.avatar = AvatarState::new(reference);
            state.avatar.clone()
        };
        self.emit(SessionEvent::AvatarChanged(avatar));
    }

    /// Updates the "regenerating" flag
    pub fn set_avatar_regenerating(&self, regenerating: bool) {
        let avatar = {
            let mut state = self.state();
            if state.avatar.regenerating == regenerating {
                return;
            }
            state.avatar.regenerating = regenerating;
            state.avatar.clone()
        };
        self.emit(SessionEvent::AvatarChanged(avatar));
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("storage_key", &self.storage_key)
            .field("turns", &self.len())
            .finish()
    }
}

/// Parses a persisted history; `None` means "treat as absent"
fn decode_history(raw: &str) -> Option<Vec<Turn>> {
    let turns: Vec<Turn> = serde_json::from_str(raw).ok()?;
    if turns.is_empty() || !turns.iter().all(Turn::is_consistent) {
        return None;
    }
    Some(turns)
}
