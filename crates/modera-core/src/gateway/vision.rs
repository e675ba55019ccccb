//! OpenAI-compatible vision gateway.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{ClassificationGateway, GatewayFailure};
use crate::media::MediaKind;

/// Tag vocabulary the model is asked to draw from.
const DANGEROUS_TAGS: &[&str] = &[
    "pornography",
    "violence",
    "profanity",
    "dangerous_symbols",
    "hate_speech",
    "weapons",
    "drugs",
    "self_harm",
    "extremism",
    "nudity",
    "sexual_content",
    "graphic_violence",
    "blood",
    "disturbing_content",
];

/// Configuration for [`OpenAiVisionGateway`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// API key for the service.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Completion token budget.
    pub max_tokens: u32,
}

impl VisionConfig {
    /// Creates a config with service defaults for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 60,
            max_tokens: 300,
        }
    }

    /// Overrides the base URL (for proxies or compatible providers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Vision classification over an OpenAI-compatible chat-completions API.
///
/// Sends the media as a base64 data URL with a prompt requesting a JSON
/// verdict (`detected_tags`, `safety_level`, `explanation`).
pub struct OpenAiVisionGateway {
    client: reqwest::Client,
    config: VisionConfig,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl OpenAiVisionGateway {
    /// Creates a gateway with the given configuration.
    pub fn new(config: VisionConfig) -> Result<Self, GatewayFailure> {
        let client = reqwest::Client::builder()
            .user_agent(format!("Modera/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayFailure::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn prompt() -> String {
        format!(
            "Analyze this media for dangerous content and suitability for a \
             crowdfunding platform. Return the result as JSON with the fields: \
             'detected_tags': a list drawn from [{}] (omit tags you did not find), \
             'safety_level': one of safe/potentially_unsafe/unsafe, \
             'explanation': reasoning plus a short presentation-quality tip. \
             safe means fully harmless, potentially_unsafe means questionable \
             elements, unsafe means clearly dangerous.",
            DANGEROUS_TAGS.join(", ")
        )
    }

    fn data_url(media: &[u8], kind: MediaKind) -> String {
        let mime = match kind {
            MediaKind::Image => "image/jpeg",
            MediaKind::Video => "video/mp4",
        };
        format!("data:{};base64,{}", mime, BASE64.encode(media))
    }
}

#[async_trait]
impl ClassificationGateway for OpenAiVisionGateway {
    async fn analyze(&self, media: &[u8], kind: MediaKind) -> Result<String, GatewayFailure> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": Self::prompt() },
                    { "type": "image_url", "image_url": { "url": Self::data_url(media, kind) } }
                ]
            }],
            "max_tokens": self.config.max_tokens,
        });

        debug!(model = %self.config.model, bytes = media.len(), "submitting media for classification");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayFailure::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayFailure::Status(status.as_u16()));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayFailure::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GatewayFailure::InvalidResponse("no completion choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_encodes_media() {
        let url = OpenAiVisionGateway::data_url(b"abc", MediaKind::Image);
        assert!(url.starts_with("data:image/jpeg;base64,"));
        assert!(url.ends_with(&BASE64.encode(b"abc")));
    }

    #[test]
    fn prompt_lists_vocabulary_and_fields() {
        let prompt = OpenAiVisionGateway::prompt();
        assert!(prompt.contains("detected_tags"));
        assert!(prompt.contains("safety_level"));
        assert!(prompt.contains("pornography"));
    }

    #[test]
    fn config_defaults() {
        let config = VisionConfig::new("sk-test");
        assert_eq!(config.model, "gpt-4o");
        assert!(config.base_url.starts_with("https://"));
    }
}
