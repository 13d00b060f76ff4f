//! Turn dispatcher
//!
//! Turns one line of user input into exactly two appended turns: the user's
//! own turn and either a companion reply or a synthesized failure turn. At
//! most one dispatch is in flight at a time; further sends while one is
//! outstanding are ignored.

use crate::agent::avatar::AvatarRefresher;
use crate::agent::failure::classify_failure;
use crate::agent::mood::parse_reply;
use crate::config::Config;
use crate::error::Result;
use crate::persona::PersonaConfig;
use crate::providers::{GenerationConfig, Message, ProviderHandle};
use crate::session::{SessionManager, Turn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Number of most recent turns sent upstream by default
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Why a send did not dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Input was empty after trimming
    EmptyInput,
    /// Another dispatch is still outstanding
    Busy,
}

/// Result of [`TurnDispatcher::send`]
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Nothing was appended and the provider was not called
    Ignored(IgnoreReason),
    /// Both turns were appended
    Completed {
        /// The user's turn
        user: Turn,
        /// The companion reply or the error turn
        reply: Turn,
    },
}

/// Holds the in-flight flag for the duration of one dispatch
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Builds the outbound history for a dispatch
///
/// Error turns are dropped first, then the last `window` turns are kept.
/// A `window` of 0 keeps everything.
///
/// # Examples
///
/// ```
/// use thansin::agent::build_request_history;
/// use thansin::providers::Role;
/// use thansin::session::{ErrorKind, Turn};
///
/// let turns = vec![
///     Turn::companion("hello"),
///     Turn::user("hi"),
///     Turn::error(ErrorKind::General, "network trouble"),
///     Turn::user("still there?"),
/// ];
/// let history = build_request_history(&turns, 2);
/// assert_eq!(history.len(), 2);
/// assert_eq!(history[0].role, Role::User);
/// assert_eq!(history[1].content, "still there?");
/// ```
pub fn build_request_history(turns: &[Turn], window: usize) -> Vec<Message> {
    let messages: Vec<Message> = turns.iter().filter_map(Turn::to_message).collect();
    if window == 0 || messages.len() <= window {
        return messages;
    }
    messages[messages.len() - window..].to_vec()
}

/// Sends user input upstream and records the outcome in the session
pub struct TurnDispatcher {
    session: Arc<SessionManager>,
    provider: Arc<ProviderHandle>,
    persona: Arc<PersonaConfig>,
    model: String,
    history_window: usize,
    avatars: Option<AvatarRefresher>,
    in_flight: AtomicBool,
}

impl TurnDispatcher {
    /// Creates a dispatcher with the default history window and no avatar refresh
    pub fn new(
        session: Arc<SessionManager>,
        provider: Arc<ProviderHandle>,
        persona: Arc<PersonaConfig>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            session,
            provider,
            persona,
            model: model.into(),
            history_window: DEFAULT_HISTORY_WINDOW,
            avatars: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Creates a dispatcher configured from `config`
    pub fn from_config(
        config: &Config,
        session: Arc<SessionManager>,
        provider: Arc<ProviderHandle>,
    ) -> Self {
        let persona = Arc::new(config.persona.clone());
        Self::new(session, provider, persona, config.provider.model.clone())
            .with_history_window(config.session.history_window)
            .with_avatar_refresh(config.session.mood_avatars)
    }

    /// Sets how many recent turns are sent upstream (0 sends all)
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    /// Enables or disables avatar regeneration after each reply
    pub fn with_avatar_refresh(mut self, enabled: bool) -> Self {
        self.avatars = enabled.then(|| {
            AvatarRefresher::new(
                Arc::clone(&self.session),
                Arc::clone(&self.provider),
                Arc::clone(&self.persona),
            )
        });
        self
    }

    /// Session this dispatcher appends to
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Whether a dispatch is outstanding
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Generation parameters sent with every dispatch
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            system_instruction: self.persona.system_instruction.clone(),
            temperature: self.persona.temperature,
            top_p: self.persona.top_p,
            model: self.model.clone(),
        }
    }

    /// Dispatches one line of user input
    ///
    /// Never fails: upstream problems are recorded as an error turn and
    /// reported through [`SendOutcome::Completed`].
    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("Send ignored: a dispatch is already in flight");
            return SendOutcome::Ignored(IgnoreReason::Busy);
        };

        let user = Turn::user(text);
        self.session.append(user.clone());

        let history = build_request_history(&self.session.turns(), self.history_window);
        tracing::info!("Dispatching turn with {} history messages", history.len());

        let reply = match self.dispatch(&history).await {
            Ok(raw) => {
                let parsed = parse_reply(&raw, &self.persona.default_mood);
                let text = if parsed.text.is_empty() {
                    tracing::debug!("Empty reply, using fallback line");
                    self.persona.empty_reply.clone()
                } else {
                    parsed.text
                };
                let turn = Turn::companion(text);
                self.session.append(turn.clone());

                if let Some(avatars) = &self.avatars {
                    avatars.request(&parsed.mood);
                }
                turn
            }
            Err(e) => {
                tracing::warn!("Dispatch failed: {:#}", e);
                let classification = classify_failure(&e, &self.persona);
                let turn = Turn::error(classification.kind, classification.display_text);
                self.session.append(turn.clone());
                turn
            }
        };

        SendOutcome::Completed { user, reply }
    }

    async fn dispatch(&self, history: &[Message]) -> Result<String> {
        let provider = self.provider.get()?;
        provider.complete(history, &self.generation_config()).await
    }
}

impl std::fmt::Debug for TurnDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnDispatcher")
            .field("model", &self.model)
            .field("history_window", &self.history_window)
            .field("avatars", &self.avatars.is_some())
            .field("busy", &self.is_busy())
            .finish()
    }
}
