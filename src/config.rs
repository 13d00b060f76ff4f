//! Configuration management for Thansin
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{CompanionError, Result};
use crate::persona::PersonaConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Credential values that ship in sample configs and must never be sent upstream
const PLACEHOLDER_API_KEYS: &[&str] = &[
    "placeholder_api_key",
    "your_api_key",
    "your-api-key",
    "your_api_key_here",
    "api_key",
    "changeme",
];

/// Main configuration structure for Thansin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider configuration (endpoint, models, credential)
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Persona configuration
    #[serde(default)]
    pub persona: PersonaConfig,
    /// Session behavior configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Provider configuration
///
/// Specifies which generation provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// API key; usually supplied through `THANSIN_API_KEY` instead of the file
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// API base URL (useful for tests and local mocks)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model used for conversation turns
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used for avatar regeneration
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_provider_type() -> String {
    "gemini".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            api_key: None,
            api_base: default_api_base(),
            model: default_model(),
            image_model: default_image_model(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Returns the API key when it is present and not a placeholder
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::config::ProviderConfig;
    ///
    /// let mut config = ProviderConfig::default();
    /// assert!(config.usable_api_key().is_none());
    ///
    /// config.api_key = Some("PLACEHOLDER_API_KEY".to_string());
    /// assert!(config.usable_api_key().is_none());
    ///
    /// config.api_key = Some("AIzaSyExample".to_string());
    /// assert_eq!(config.usable_api_key(), Some("AIzaSyExample"));
    /// ```
    pub fn usable_api_key(&self) -> Option<&str> {
        let key = self.api_key.as_deref()?.trim();
        if key.is_empty() || is_placeholder_key(key) {
            None
        } else {
            Some(key)
        }
    }

    /// Whether a dispatch can be attempted with the configured credential
    pub fn has_usable_api_key(&self) -> bool {
        self.usable_api_key().is_some()
    }
}

fn is_placeholder_key(key: &str) -> bool {
    let lowered = key.to_ascii_lowercase();
    PLACEHOLDER_API_KEYS.contains(&lowered.as_str())
        || (key.starts_with('<') && key.ends_with('>'))
        || (key.starts_with("${") && key.ends_with('}'))
}

/// Session behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of most recent turns sent upstream (0 sends the whole history)
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Storage key for persisted history; embeds the schema version
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Regenerate the avatar from the mood marker of each reply
    #[serde(default = "default_mood_avatars")]
    pub mood_avatars: bool,
}

fn default_history_window() -> usize {
    10
}

fn default_storage_key() -> String {
    "thansin_chat_history_v2".to_string()
}

fn default_mood_avatars() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            storage_key: default_storage_key(),
            mood_avatars: default_mood_avatars(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig::default(),
            persona: PersonaConfig::default(),
            session: SessionConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CompanionError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CompanionError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("THANSIN_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        // First non-empty wins; API_KEY is what the hosted web build used
        for var in ["THANSIN_API_KEY", "GEMINI_API_KEY", "API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    tracing::debug!("Using API key from {}", var);
                    self.provider.api_key = Some(key);
                    break;
                }
            }
        }

        if let Ok(api_base) = std::env::var("THANSIN_API_BASE") {
            self.provider.api_base = api_base;
        }

        if let Ok(model) = std::env::var("THANSIN_MODEL") {
            self.provider.model = model;
        }

        if let Ok(image_model) = std::env::var("THANSIN_IMAGE_MODEL") {
            self.provider.image_model = image_model;
        }

        if let Ok(timeout) = std::env::var("THANSIN_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid THANSIN_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(window) = std::env::var("THANSIN_HISTORY_WINDOW") {
            if let Ok(value) = window.parse() {
                self.session.history_window = value;
            } else {
                tracing::warn!("Invalid THANSIN_HISTORY_WINDOW: {}", window);
            }
        }

        if let Ok(storage_key) = std::env::var("THANSIN_STORAGE_KEY") {
            self.session.storage_key = storage_key;
        }

        if let Ok(flag) = std::env::var("THANSIN_MOOD_AVATARS") {
            match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.session.mood_avatars = true,
                "0" | "false" | "no" | "off" => self.session.mood_avatars = false,
                _ => tracing::warn!("Invalid THANSIN_MOOD_AVATARS: {}", flag),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
        if cli.no_avatars {
            self.session.mood_avatars = false;
        }
    }

    /// Validate the configuration
    ///
    /// A missing API key is not a validation error: it is detected before
    /// each dispatch and surfaced to the user as an `auth` failure turn.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["gemini"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(CompanionError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        url::Url::parse(&self.provider.api_base).map_err(|e| {
            CompanionError::Config(format!(
                "provider.api_base is not a valid URL ({}): {}",
                self.provider.api_base, e
            ))
        })?;

        if self.provider.model.trim().is_empty() {
            return Err(CompanionError::Config("provider.model cannot be empty".to_string()).into());
        }

        if self.provider.image_model.trim().is_empty() {
            return Err(
                CompanionError::Config("provider.image_model cannot be empty".to_string()).into(),
            );
        }

        if self.provider.timeout_seconds == 0 {
            return Err(CompanionError::Config(
                "provider.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if !(0.0..=2.0).contains(&self.persona.temperature) {
            return Err(CompanionError::Config(
                "persona.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.persona.top_p <= 0.0 || self.persona.top_p > 1.0 {
            return Err(CompanionError::Config(
                "persona.top_p must be greater than 0.0 and at most 1.0".to_string(),
            )
            .into());
        }

        if self.persona.greeting.trim().is_empty() {
            return Err(
                CompanionError::Config("persona.greeting cannot be empty".to_string()).into(),
            );
        }

        if self.session.history_window > 1000 {
            return Err(CompanionError::Config(
                "session.history_window must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.session.storage_key.trim().is_empty() {
            return Err(
                CompanionError::Config("session.storage_key cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
