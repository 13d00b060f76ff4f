//! Mood-driven avatar regeneration
//!
//! Each request gets a sequence number. Requests run in the background and
//! may finish in any order; only the result of the most recently issued
//! request is applied to the session, older ones are dropped.

use crate::persona::PersonaConfig;
use crate::providers::ProviderHandle;
use crate::session::SessionManager;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use url::Url;

static PLACEHOLDER_HOST: Lazy<Url> =
    Lazy::new(|| Url::parse("https://picsum.photos/").expect("valid url"));

/// Deterministic stand-in image for a mood
///
/// The mood is percent-encoded as one path segment.
///
/// # Examples
///
/// ```
/// use thansin::agent::avatar::placeholder_avatar;
///
/// assert_eq!(
///     placeholder_avatar("shy"),
///     "https://picsum.photos/seed/thansin-shy/400/400"
/// );
/// ```
pub fn placeholder_avatar(mood: &str) -> String {
    let seed = format!("thansin-{}", mood);
    let mut url = PLACEHOLDER_HOST.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(["seed", seed.as_str(), "400", "400"]);
    }
    url.into()
}

/// Issues avatar regeneration requests and applies the latest result
#[derive(Clone)]
pub struct AvatarRefresher {
    session: Arc<SessionManager>,
    provider: Arc<ProviderHandle>,
    persona: Arc<PersonaConfig>,
    latest: Arc<AtomicU64>,
    // Serializes "issue" against "apply" so a request issued while an older
    // result is being applied keeps the regenerating flag set.
    apply: Arc<Mutex<()>>,
}

impl AvatarRefresher {
    /// Creates a refresher writing into `session`
    pub fn new(
        session: Arc<SessionManager>,
        provider: Arc<ProviderHandle>,
        persona: Arc<PersonaConfig>,
    ) -> Self {
        Self {
            session,
            provider,
            persona,
            latest: Arc::new(AtomicU64::new(0)),
            apply: Arc::new(Mutex::new(())),
        }
    }

    /// Starts regenerating the avatar for `mood`
    ///
    /// Returns immediately; the returned handle is only needed by callers
    /// that want to wait for the outcome. Must be called from within a
    /// tokio runtime.
    pub fn request(&self, mood: &str) -> JoinHandle<()> {
        let seq = {
            let _apply = self.apply.lock().unwrap_or_else(PoisonError::into_inner);
            let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            self.session.set_avatar_regenerating(true);
            seq
        };
        tracing::debug!("Avatar request #{} for mood {}", seq, mood);

        let this = self.clone();
        let mood = mood.to_string();
        tokio::spawn(async move {
            let reference = this.generate(&mood).await;
            this.finish(seq, reference);
        })
    }

    async fn generate(&self, mood: &str) -> String {
        let prompt = self.persona.avatar_prompt_for(mood);
        let result = match self.provider.get() {
            Ok(provider) => {
                provider
                    .generate_image(&prompt, &self.persona.avatar_aspect_ratio)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(image) => image.to_reference(),
            Err(e) => {
                tracing::warn!("Avatar generation failed for mood {}: {:#}", mood, e);
                placeholder_avatar(mood)
            }
        }
    }

    fn finish(&self, seq: u64, reference: String) {
        let _apply = self.apply.lock().unwrap_or_else(PoisonError::into_inner);
        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!("Discarding stale avatar result #{}", seq);
            return;
        }
        self.session.apply_avatar(reference);
    }

    /// Sequence number of the most recently issued request (0 before any)
    pub fn latest_request(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for AvatarRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarRefresher")
            .field("latest", &self.latest_request())
            .finish()
    }
}
