//! Text Q&A client backing the `/api/ask` pass-through.
//!
//! Unrelated to the moderation workflow: the endpoint forwards a
//! context/question pair to a chat model and returns the answer text.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of the upstream text service. Surfaced to callers as a 500.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status from the service.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Unusable response body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Configuration for [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// API key for the service.
    pub api_key: String,
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token budget.
    pub max_tokens: u32,
}

impl ChatConfig {
    /// Creates a config with service defaults for the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            temperature: 0.5,
            max_tokens: 1000,
        }
    }

    /// Overrides the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Chat-completions client for text analysis questions.
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
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

impl ChatClient {
    /// Creates a client with the given configuration.
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("Modera/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ChatError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Ask a question about a piece of text. Returns the trimmed answer.
    pub async fn ask(&self, context: &str, question: &str) -> Result<String, ChatError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an AI assistant that analyzes text and answers questions about it."
                },
                {
                    "role": "user",
                    "content": format!("Text: {context}\n\nQuestion: {question}")
                }
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        debug!(model = %self.config.model, "forwarding question to text service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Status(status.as_u16()));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|answer| answer.trim().to_string())
            .ok_or_else(|| ChatError::InvalidResponse("no completion choices".to_string()))
    }
}
