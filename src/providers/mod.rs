//! Provider module for Thansin
//!
//! This module contains the generation provider abstraction, the Gemini
//! implementation, and [`ProviderHandle`], the lazily initialized client slot
//! the dispatcher and avatar refresher share.

pub mod base;
pub mod gemini;

pub use base::{GenerationConfig, ImageOutput, Message, Provider, Role};
pub use gemini::GeminiProvider;

use crate::config::ProviderConfig;
use crate::error::{CompanionError, Result};
use std::sync::{Arc, Mutex};

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
/// (including a missing or placeholder API key)
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        other => Err(CompanionError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}

type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn Provider>> + Send + Sync>;

/// Lazily (re-)initializable provider slot
///
/// The first call to [`ProviderHandle::get`] builds the provider through the
/// factory and caches it. Failed initializations are not cached, so a
/// credential configured after start-up is picked up by the next dispatch.
///
/// # Examples
///
/// ```
/// use thansin::config::ProviderConfig;
/// use thansin::providers::ProviderHandle;
///
/// // No API key configured: initialization fails, and keeps failing
/// // until the handle can build a client.
/// let handle = ProviderHandle::from_config(ProviderConfig::default());
/// assert!(handle.get().is_err());
/// assert!(!handle.is_initialized());
/// ```
pub struct ProviderHandle {
    factory: ProviderFactory,
    slot: Mutex<Option<Arc<dyn Provider>>>,
}

impl ProviderHandle {
    /// Creates a handle that builds its provider with `factory` on first use
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            slot: Mutex::new(None),
        }
    }

    /// Creates a handle backed by [`create_provider`] for `config`
    pub fn from_config(config: ProviderConfig) -> Self {
        Self::new(move || create_provider(&config))
    }

    /// Creates a handle that is already initialized with `provider`
    ///
    /// After [`ProviderHandle::reset`] the handle reports
    /// [`CompanionError::NotInitialized`].
    pub fn from_provider(provider: Arc<dyn Provider>) -> Self {
        Self {
            factory: Box::new(|| Err(CompanionError::NotInitialized.into())),
            slot: Mutex::new(Some(provider)),
        }
    }

    /// Returns the cached provider, initializing it if needed
    ///
    /// # Errors
    ///
    /// Returns the factory's error when initialization fails
    pub fn get(&self) -> Result<Arc<dyn Provider>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CompanionError::Provider("Provider handle lock poisoned".to_string()))?;

        if let Some(provider) = slot.as_ref() {
            return Ok(Arc::clone(provider));
        }

        let provider = (self.factory)()?;
        tracing::debug!("Provider initialized: {}", provider.name());
        *slot = Some(Arc::clone(&provider));
        Ok(provider)
    }

    /// Drops the cached provider so the next `get` rebuilds it
    pub fn reset(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
            tracing::debug!("Provider handle reset");
        }
    }

    /// Whether a provider is currently cached
    pub fn is_initialized(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
