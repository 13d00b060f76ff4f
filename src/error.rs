//! Error types for Thansin
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Thansin operations
///
/// Dispatch failures never reach the user as raw errors: the failure
/// classifier in [`crate::agent::failure`] turns them into error turns.
/// These variants are what that classifier inspects first.
#[derive(Error, Debug)]
pub enum CompanionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (transport, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Upstream API returned a non-success status
    ///
    /// `code` carries the upstream status text (for Gemini, values such as
    /// `PERMISSION_DENIED` or `RESOURCE_EXHAUSTED`) when the body had one.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Upstream status text, if the error envelope had one
        code: Option<String>,
        /// Upstream error message or raw body
        message: String,
    },

    /// Missing or placeholder credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The dispatcher has no usable provider
    #[error("Dispatcher is not initialized")]
    NotInitialized,

    /// History storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Thansin operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
