//! Base provider trait and common types for Thansin
//!
//! This module defines the Provider trait that generation backends implement,
//! along with the outbound message type, generation parameters and the image
//! payload returned by avatar requests.

use crate::error::{CompanionError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Author of an outbound message, in the upstream API's vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation
    User,
    /// The companion side of the conversation
    Model,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

/// Message structure for an outbound request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Text of the message
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::providers::{Message, Role};
    ///
    /// let msg = Message::user("Hello");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates a new model message
    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

/// Generation parameters sent alongside the history
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// System instruction text
    pub system_instruction: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling bound
    pub top_p: f32,
    /// Target model identifier
    pub model: String,
}

/// Image returned by an avatar request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutput {
    /// Raw image bytes with their MIME type
    Inline {
        /// MIME type reported by the provider
        mime_type: String,
        /// Decoded image bytes
        data: Vec<u8>,
    },
    /// A remote image reference
    Url(String),
}

impl ImageOutput {
    /// Renders the image as a reference usable by a front end
    ///
    /// Inline images become `data:` URLs.
    ///
    /// # Examples
    ///
    /// ```
    /// use thansin::providers::ImageOutput;
    ///
    /// let image = ImageOutput::Inline { mime_type: "image/png".into(), data: vec![1, 2, 3] };
    /// assert_eq!(image.to_reference(), "data:image/png;base64,AQID");
    /// ```
    pub fn to_reference(&self) -> String {
        match self {
            Self::Inline { mime_type, data } => {
                format!("data:{};base64,{}", mime_type, BASE64.encode(data))
            }
            Self::Url(url) => url.clone(),
        }
    }
}

/// Provider trait for generation backends
///
/// # Examples
///
/// ```no_run
/// use thansin::providers::{GenerationConfig, Message, Provider};
/// use thansin::error::Result;
/// use async_trait::async_trait;
///
/// struct EchoProvider;
///
/// #[async_trait]
/// impl Provider for EchoProvider {
///     async fn complete(&self, messages: &[Message], _config: &GenerationConfig) -> Result<String> {
///         Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generates the next companion reply for the given history
    ///
    /// Returns the raw reply text, which may contain a mood marker and may be
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or the response is unusable
    async fn complete(&self, messages: &[Message], config: &GenerationConfig) -> Result<String>;

    /// Generates an image from a descriptive prompt
    ///
    /// # Default Implementation
    ///
    /// Returns an error indicating that image generation is not supported.
    async fn generate_image(&self, _prompt: &str, _aspect_ratio: &str) -> Result<ImageOutput> {
        Err(CompanionError::Provider(
            "Image generation is not supported by this provider".to_string(),
        )
        .into())
    }

    /// Short provider name for logs
    fn name(&self) -> &str {
        "provider"
    }
}
