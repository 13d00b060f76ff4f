//! Test utilities for Thansin
//!
//! This module provides a scripted provider, session builders and assertion
//! helpers shared by the unit tests.

use crate::error::{CompanionError, Result};
use crate::providers::{GenerationConfig, ImageOutput, Message, Provider, ProviderHandle};
use crate::session::{AvatarState, SessionManager};
use crate::storage::MemoryStore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// One scripted response to `complete`
enum Step {
    Reply(String),
    Fail(CompanionError),
}

/// Scripted response to `generate_image` for prompts containing `matcher`
struct ImageStep {
    matcher: String,
    delay: Duration,
    reference: Option<String>,
}

/// Provider that replays canned replies and records what it was sent
///
/// # Examples
///
/// ```ignore
/// use thansin::test_utils::ScriptedProvider;
///
/// let provider = ScriptedProvider::replies(vec!["hello [MOOD: shy]"]);
/// ```
#[derive(Default)]
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    images: Mutex<Vec<ImageStep>>,
    requests: Mutex<Vec<Vec<Message>>>,
    image_prompts: Mutex<Vec<String>>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl ScriptedProvider {
    /// Replies with each string in order, then with empty replies
    pub fn replies(replies: Vec<&str>) -> Self {
        Self {
            steps: Mutex::new(replies.into_iter().map(|r| Step::Reply(r.to_string())).collect()),
            ..Default::default()
        }
    }

    /// Fails the next `complete` with `error`
    pub fn failing(error: CompanionError) -> Self {
        Self {
            steps: Mutex::new(VecDeque::from([Step::Fail(error)])),
            ..Default::default()
        }
    }

    /// Queues a failure after the already scripted steps
    pub fn then_fail(self, error: CompanionError) -> Self {
        self.steps.lock().unwrap().push_back(Step::Fail(error));
        self
    }

    /// Queues a reply after the already scripted steps
    pub fn then_reply(self, reply: &str) -> Self {
        self.steps
            .lock()
            .unwrap()
            .push_back(Step::Reply(reply.to_string()));
        self
    }

    /// Makes `complete` signal `entered` and then wait for `release`
    pub fn gated(self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..self
        }
    }

    /// Answers image prompts containing `matcher` after `delay`
    ///
    /// `None` makes the request fail.
    pub fn with_image(self, matcher: &str, delay: Duration, reference: Option<&str>) -> Self {
        self.images.lock().unwrap().push(ImageStep {
            matcher: matcher.to_string(),
            delay,
            reference: reference.map(str::to_string),
        });
        self
    }

    /// Histories received by `complete`, oldest first
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    /// Prompts received by `generate_image`, oldest first
    pub fn image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn complete(&self, messages: &[Message], _config: &GenerationConfig) -> Result<String> {
        self.requests.lock().unwrap().push(messages.to_vec());

        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }

        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail(error)) => Err(error.into()),
            None => Ok(String::new()),
        }
    }

    async fn generate_image(&self, prompt: &str, _aspect_ratio: &str) -> Result<ImageOutput> {
        self.image_prompts.lock().unwrap().push(prompt.to_string());

        let scripted = self
            .images
            .lock()
            .unwrap()
            .iter()
            .find(|step| prompt.contains(&step.matcher))
            .map(|step| (step.delay, step.reference.clone()));

        let (delay, reference) = scripted.ok_or_else(|| {
            CompanionError::Provider(format!("no scripted image for prompt: {}", prompt))
        })?;

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        reference.map(ImageOutput::Url).ok_or_else(|| {
            CompanionError::Provider("scripted image failure".to_string()).into()
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Wraps a provider in an initialized handle
pub fn handle_for(provider: Arc<ScriptedProvider>) -> Arc<ProviderHandle> {
    Arc::new(ProviderHandle::from_provider(provider))
}

/// Session over an in-memory store, greeting installed
pub fn test_session() -> (Arc<SessionManager>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(SessionManager::new(
        store.clone(),
        "test_history_v1",
        "hello Maung",
        AvatarState::new("avatar://initial"),
    ));
    session.load_or_init();
    (session, store)
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;

    fn generation() -> GenerationConfig {
        GenerationConfig {
            system_instruction: String::new(),
            temperature: 0.9,
            top_p: 0.95,
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::replies(vec!["one", "two"])
            .then_fail(CompanionError::Provider("boom".to_string()));
        let messages = [Message::user("hi")];

        assert_eq!(provider.complete(&messages, &generation()).await.unwrap(), "one");
        assert_eq!(provider.complete(&messages, &generation()).await.unwrap(), "two");
        assert_error_contains(provider.complete(&messages, &generation()).await, "boom");
        assert_eq!(provider.complete(&messages, &generation()).await.unwrap(), "");

        let requests = provider.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0][0].role, Role::User);
    }

    #[tokio::test]
    async fn test_scripted_images_match_prompt() {
        let provider = ScriptedProvider::replies(vec![])
            .with_image("shy", Duration::ZERO, Some("https://img/shy.png"))
            .with_image("sad", Duration::ZERO, None);

        let image = provider.generate_image("portrait, shy", "1:1").await.unwrap();
        assert_eq!(image.to_reference(), "https://img/shy.png");
        assert_error_contains(provider.generate_image("portrait, sad", "1:1").await, "failure");
        assert_error_contains(provider.generate_image("portrait, odd", "1:1").await, "no scripted");
        assert_eq!(provider.image_prompts().len(), 3);
    }

    #[test]
    fn test_test_session_starts_with_greeting() {
        let (session, store) = test_session();
        assert_eq!(session.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }
}
