//! Gemini provider implementation for Thansin
//!
//! Talks to the Gemini `generateContent` endpoint for both conversation turns
//! and avatar images. Non-success responses are turned into
//! [`CompanionError::Api`] with the upstream status text preserved so the
//! failure classifier can tell permission problems from quota problems.

use crate::config::ProviderConfig;
use crate::error::{CompanionError, Result};
use crate::providers::{GenerationConfig, ImageOutput, Message, Provider};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use thansin::config::ProviderConfig;
/// use thansin::providers::{GeminiProvider, GenerationConfig, Message, Provider};
///
/// # async fn example() -> thansin::error::Result<()> {
/// let config = ProviderConfig {
///     api_key: Some("AIza...".to_string()),
///     ..Default::default()
/// };
/// let provider = GeminiProvider::new(config)?;
/// let generation = GenerationConfig {
///     system_instruction: "Be kind".to_string(),
///     temperature: 0.9,
///     top_p: 0.95,
///     model: "gemini-3-flash-preview".to_string(),
/// };
/// let reply = provider.complete(&[Message::user("Hello!")], &generation).await?;
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    image_model: String,
}

/// Request body for `generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<GeminiImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiImageConfig {
    aspect_ratio: String,
}

/// Response body from `generateContent`
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
    #[serde(default, alias = "inline_data")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    #[serde(default, alias = "mime_type")]
    mime_type: Option<String>,
    data: String,
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`
#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::MissingCredentials` if the API key is absent or
    /// a placeholder, and `CompanionError::Provider` if the HTTP client cannot
    /// be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key = config
            .usable_api_key()
            .ok_or_else(|| CompanionError::MissingCredentials("gemini".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("thansin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CompanionError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized Gemini provider: api_base={}, image_model={}",
            config.api_base,
            config.image_model
        );

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            image_model: config.image_model,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{}", trimmed)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_chat_request(messages: &[Message], config: &GenerationConfig) -> GeminiRequest {
        let contents = messages
            .iter()
            .map(|m| GeminiContent {
                role: m.role.to_string(),
                parts: vec![GeminiTextPart {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system_instruction = if config.system_instruction.trim().is_empty() {
            None
        } else {
            Some(GeminiSystemInstruction {
                parts: vec![GeminiTextPart {
                    text: config.system_instruction.clone(),
                }],
            })
        };

        GeminiRequest {
            contents,
            system_instruction,
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(config.temperature),
                top_p: Some(config.top_p),
                ..Default::default()
            }),
        }
    }

    fn build_image_request(prompt: &str, aspect_ratio: &str) -> GeminiRequest {
        let aspect_ratio = aspect_ratio.trim();
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiTextPart {
                    text: prompt.to_string(),
                }],
            }],
            system_instruction: None,
            generation_config: Some(GeminiGenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                image_config: (!aspect_ratio.is_empty()).then(|| GeminiImageConfig {
                    aspect_ratio: aspect_ratio.to_string(),
                }),
                ..Default::default()
            }),
        }
    }

    async fn post(&self, url: &str, request: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Gemini request failed: {}", e);
                CompanionError::Provider(format!("Gemini request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(format_gemini_api_error(status.as_u16(), &error_text).into());
        }

        response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            CompanionError::Provider(format!("Failed to parse Gemini response: {}", e)).into()
        })
    }
}

/// Turns a non-success response into a typed API error
fn format_gemini_api_error(status: u16, body: &str) -> CompanionError {
    match serde_json::from_str::<GeminiErrorEnvelope>(body) {
        Ok(envelope) => CompanionError::Api {
            status,
            code: envelope.error.status,
            message: if envelope.error.message.is_empty() {
                body.to_string()
            } else {
                envelope.error.message
            },
        },
        Err(_) => CompanionError::Api {
            status,
            code: None,
            message: body.to_string(),
        },
    }
}

/// Joins the visible text parts of the first candidate
fn extract_text(response: GeminiResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| !part.thought.unwrap_or(false))
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// Finds the first inline image across all candidates
fn extract_image(response: GeminiResponse) -> Result<ImageOutput> {
    let inline = response
        .candidates
        .into_iter()
        .filter_map(|candidate| candidate.content)
        .flat_map(|content| content.parts)
        .filter_map(|part| part.inline_data)
        .find(|inline| !inline.data.is_empty())
        .ok_or_else(|| CompanionError::Provider("Gemini returned no image data".to_string()))?;

    let data = BASE64.decode(inline.data.as_bytes()).map_err(|e| {
        CompanionError::Provider(format!("Gemini image base64 decode failed: {}", e))
    })?;

    Ok(ImageOutput::Inline {
        mime_type: inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
        data,
    })
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, messages: &[Message], config: &GenerationConfig) -> Result<String> {
        let url = self.endpoint_for_model(&config.model);
        let request = Self::build_chat_request(messages, config);

        tracing::debug!(
            "Sending Gemini request: model={}, {} messages",
            config.model,
            request.contents.len()
        );

        let response = self.post(&url, &request).await?;
        let text = extract_text(response);

        tracing::debug!("Gemini reply: {} chars", text.chars().count());
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str, aspect_ratio: &str) -> Result<ImageOutput> {
        let url = self.endpoint_for_model(&self.image_model);
        let request = Self::build_image_request(prompt, aspect_ratio);

        tracing::debug!(
            "Sending Gemini image request: model={}, aspect_ratio={}",
            self.image_model,
            aspect_ratio
        );

        let response = self.post(&url, &request).await?;
        extract_image(response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;

    fn test_provider() -> GeminiProvider {
        GeminiProvider::new(ProviderConfig {
            api_key: Some("test-key".to_string()),
            api_base: "http://localhost:9000/v1beta/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn generation() -> GenerationConfig {
        GenerationConfig {
            system_instruction: "Be sweet".to_string(),
            temperature: 0.9,
            top_p: 0.95,
            model: "gemini-3-flash-preview".to_string(),
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        let err = GeminiProvider::new(ProviderConfig::default()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CompanionError>(),
            Some(CompanionError::MissingCredentials(_))
        ));
    }

    #[test]
    fn test_new_rejects_placeholder_key() {
        let config = ProviderConfig {
            api_key: Some("PLACEHOLDER_API_KEY".to_string()),
            ..Default::default()
        };
        assert!(GeminiProvider::new(config).is_err());
    }

    #[test]
    fn test_endpoint_for_model() {
        let provider = test_provider();
        assert_eq!(
            provider.endpoint_for_model("gemini-3-flash-preview"),
            "http://localhost:9000/v1beta/models/gemini-3-flash-preview:generateContent"
        );
        assert_eq!(
            provider.endpoint_for_model("models/gemini-2.5-flash"),
            "http://localhost:9000/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_build_chat_request_shape() {
        let messages = vec![
            Message::model("Hi Maung"),
            Message::user("Hello"),
        ];
        let request = GeminiProvider::build_chat_request(&messages, &generation());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["contents"][0]["role"], "model");
        assert_eq!(json["contents"][1]["role"], "user");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "Hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be sweet");
        assert!((json["generationConfig"]["topP"].as_f64().unwrap() - 0.95).abs() < 1e-6);
        assert!(json["generationConfig"].get("responseModalities").is_none());
    }

    #[test]
    fn test_build_chat_request_omits_blank_system_instruction() {
        let mut config = generation();
        config.system_instruction = "  ".to_string();
        let request = GeminiProvider::build_chat_request(&[Message::user("x")], &config);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_build_image_request_shape() {
        let request = GeminiProvider::build_image_request("portrait, shy", "1:1");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "portrait, shy");
        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
        assert_eq!(json["generationConfig"]["imageConfig"]["aspectRatio"], "1:1");
        assert!(json["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_format_api_error_parses_envelope() {
        let body = r#"{"error":{"code":403,"message":"Permission denied on resource","status":"PERMISSION_DENIED"}}"#;
        match format_gemini_api_error(403, body) {
            CompanionError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 403);
                assert_eq!(code.as_deref(), Some("PERMISSION_DENIED"));
                assert_eq!(message, "Permission denied on resource");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_format_api_error_keeps_raw_body() {
        match format_gemini_api_error(502, "Bad Gateway") {
            CompanionError::Api { code, message, .. } => {
                assert!(code.is_none());
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_skips_thoughts() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"text": "မောင်... "},
                        {"text": "[MOOD: shy]"}
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(response), "မောင်... [MOOD: shy]");
    }

    #[test]
    fn test_extract_text_without_candidates_is_empty() {
        let response: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_text(response), "");
    }

    #[test]
    fn test_extract_image_decodes_inline_data() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "here you go"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": "AQID"}}
                    ]
                }
            }]
        }))
        .unwrap();
        assert_eq!(
            extract_image(response).unwrap(),
            ImageOutput::Inline {
                mime_type: "image/jpeg".to_string(),
                data: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn test_extract_image_without_data_fails() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "no image today"}]}}]
        }))
        .unwrap();
        assert!(extract_image(response).is_err());
    }

    #[test]
    fn test_roles_map_to_gemini_roles() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Model.to_string(), "model");
    }
}
