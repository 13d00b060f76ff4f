//! Failure classification for dispatches
//!
//! Maps any failure raised while producing a companion reply to one of three
//! kinds and the persona-styled text shown for it. Typed errors are inspected
//! first; only when the failure carries no usable type does the classifier
//! fall back to matching on the upstream status text and message. This is
//! the only place in the crate that discriminates errors by string content.

use crate::error::CompanionError;
use crate::persona::PersonaConfig;
use crate::session::ErrorKind;

/// Markers of a missing, invalid or revoked credential
const AUTH_MARKERS: &[&str] = &[
    "permission_denied",
    "permission denied",
    "unauthenticated",
    "api key not valid",
    "api_key_invalid",
    "api key expired",
];

/// Markers of an exhausted rate or usage limit
const QUOTA_MARKERS: &[&str] = &["resource_exhausted", "quota", "rate limit"];

/// Outcome of classifying a failed dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Failure kind recorded on the error turn
    pub kind: ErrorKind,
    /// Persona-styled text shown to the user
    pub display_text: String,
}

/// Classifies a dispatch failure
///
/// # Examples
///
/// ```
/// use thansin::agent::failure::classify_failure;
/// use thansin::error::CompanionError;
/// use thansin::persona::PersonaConfig;
/// use thansin::session::ErrorKind;
///
/// let persona = PersonaConfig::default();
/// let err = CompanionError::Api {
///     status: 429,
///     code: Some("RESOURCE_EXHAUSTED".to_string()),
///     message: "Quota exceeded".to_string(),
/// };
/// let classification = classify_failure(&err.into(), &persona);
/// assert_eq!(classification.kind, ErrorKind::Quota);
/// assert_eq!(classification.display_text, persona.failure_messages.quota);
/// ```
pub fn classify_failure(err: &anyhow::Error, persona: &PersonaConfig) -> Classification {
    let kind = classify_kind(err);
    tracing::debug!("Classified dispatch failure as {}: {:#}", kind, err);

    let messages = &persona.failure_messages;
    let display_text = match kind {
        ErrorKind::Auth => messages.auth.clone(),
        ErrorKind::Quota => messages.quota.clone(),
        ErrorKind::General => messages.general.clone(),
    };

    Classification { kind, display_text }
}

fn classify_kind(err: &anyhow::Error) -> ErrorKind {
    if let Some(typed) = err.downcast_ref::<CompanionError>() {
        match typed {
            CompanionError::MissingCredentials(_) | CompanionError::Authentication(_) => {
                return ErrorKind::Auth;
            }
            CompanionError::Api { status, code, message } => {
                match *status {
                    401 | 403 => return ErrorKind::Auth,
                    429 => return ErrorKind::Quota,
                    _ => {}
                }
                let text = format!("{} {}", code.as_deref().unwrap_or_default(), message);
                return classify_text(&text);
            }
            CompanionError::NotInitialized => return ErrorKind::General,
            _ => {}
        }
    }

    classify_text(&format!("{:#}", err))
}

fn classify_text(text: &str) -> ErrorKind {
    let lowered = text.to_lowercase();
    if AUTH_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ErrorKind::Auth
    } else if QUOTA_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ErrorKind::Quota
    } else {
        ErrorKind::General
    }
}
