//! Chat turns
//!
//! A [`Turn`] is immutable once built: fields are private and only the
//! constructors can create one, which keeps `error_kind` set exactly when
//! `is_error` is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::{Message, Role};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The person at the keyboard
    User,
    /// The companion persona
    Companion,
}

/// Failure taxonomy for synthesized error turns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Credential missing, invalid or revoked
    Auth,
    /// Rate or usage limit exceeded
    Quota,
    /// Everything else
    General,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Quota => write!(f, "quota"),
            Self::General => write!(f, "general"),
        }
    }
}

/// One message unit in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    id: String,
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_kind: Option<ErrorKind>,
}

impl Turn {
    fn new(speaker: Speaker, text: String, error_kind: Option<ErrorKind>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            speaker,
            text,
            created_at: Utc::now(),
            is_error: error_kind.is_some(),
            error_kind,
        }
    }

    /// Creates a user turn
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::session::{Speaker, Turn};
    ///
    /// let turn = Turn::user("ချစ်တယ်");
    /// assert_eq!(turn.speaker(), Speaker::User);
    /// assert!(!turn.is_error());
    /// ```
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text.into(), None)
    }

    /// Creates a genuine companion turn
    pub fn companion(text: impl Into<String>) -> Self {
        Self::new(Speaker::Companion, text.into(), None)
    }

    /// Creates a synthesized failure turn, shown as the companion speaking
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::session::{ErrorKind, Turn};
    ///
    /// let turn = Turn::error(ErrorKind::Quota, "please wait");
    /// assert!(turn.is_error());
    /// assert_eq!(turn.error_kind(), Some(ErrorKind::Quota));
    /// ```
    pub fn error(kind: ErrorKind, text: impl Into<String>) -> Self {
        Self::new(Speaker::Companion, text.into(), Some(kind))
    }

    /// Stable identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Author of the turn
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// Display text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether this turn is a synthesized failure message
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Failure kind, present only on error turns
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Whether the error flag and error kind agree
    ///
    /// Always true for turns built in-process; checked on persisted turns.
    pub fn is_consistent(&self) -> bool {
        self.is_error == self.error_kind.is_some()
    }

    /// Outbound form of the turn, or `None` for error turns
    pub fn to_message(&self) -> Option<Message> {
        if self.is_error {
            return None;
        }
        let role = match self.speaker {
            Speaker::User => Role::User,
            Speaker::Companion => Role::Model,
        };
        Some(Message {
            role,
            content: self.text.clone(),
        })
    }
}
