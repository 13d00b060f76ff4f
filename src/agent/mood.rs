//! Mood marker parsing
//!
//! Companion replies end with a bracketed tag such as `[MOOD: shy]`. The tag
//! is matched case-insensitively anywhere in the reply as
//! `[MOOD:` + optional whitespace + one word + `]`. Every occurrence is
//! stripped from the display text; the word of the last occurrence, lower-cased,
//! is the reply's mood.

use once_cell::sync::Lazy;
use regex::Regex;

static MOOD_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[MOOD:\s*(\w+)\]").expect("valid regex"));

/// A reply split into display text and mood
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    /// Reply with every mood marker removed and surrounding whitespace trimmed
    pub text: String,
    /// Lower-cased mood word
    pub mood: String,
}

/// Splits a raw reply into display text and mood
///
/// `default_mood` is used when the reply carries no marker. The returned text
/// may be empty; substituting a fallback line is the caller's decision.
///
/// # Examples
///
/// ```
/// use thansin::agent::mood::parse_reply;
///
/// let parsed = parse_reply("မောင်... [MOOD: shy]", "happy");
/// assert_eq!(parsed.text, "မောင်...");
/// assert_eq!(parsed.mood, "shy");
///
/// let parsed = parse_reply("no tag here", "happy");
/// assert_eq!(parsed.mood, "happy");
/// ```
pub fn parse_reply(raw: &str, default_mood: &str) -> ParsedReply {
    let mood = MOOD_MARKER
        .captures_iter(raw)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|word| word.as_str().to_lowercase())
        .unwrap_or_else(|| default_mood.to_lowercase());

    ParsedReply {
        text: strip_mood_markers(raw),
        mood,
    }
}

/// Removes every mood marker and trims the result
///
/// Removal repeats until no marker is left, so a marker assembled by removing
/// an inner one is removed too and stripping twice equals stripping once.
pub fn strip_mood_markers(raw: &str) -> String {
    let mut text = raw.to_string();
    while MOOD_MARKER.is_match(&text) {
        text = MOOD_MARKER.replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}
