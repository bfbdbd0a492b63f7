//! Minimal OpenAI REST API client.
//!
//! A clean client for the chat-completions endpoint with no domain-specific
//! logic. Callers build a [`ChatRequest`], send it, and get the first
//! choice's content back.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest, Message};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! let response = client
//!     .chat_completion(
//!         ChatRequest::new("gpt-4o-mini")
//!             .message(Message::system("You are a helpful assistant."))
//!             .message(Message::user("Hello!")),
//!     )
//!     .await?;
//!
//! println!("{}", response.content);
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::{ChatRequest, ChatResponse, Message, Usage};

use reqwest::Client;
use tracing::{debug, warn};

/// OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Sends the request and returns the first choice's content. Non-success
    /// responses carry the error payload's embedded `error.message` when the
    /// API provides one, else the transport status.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = types::api_error_message(&error_text).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            warn!(status = %status, message = %message, "OpenAI API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat_response: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api {
                status: status.as_u16(),
                message: "no response choices returned".to_string(),
            })?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: chat_response.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder() {
        let client = OpenAIClient::new("sk-test").with_base_url("https://custom.api.com");

        assert_eq!(client.api_key, "sk-test");
        assert_eq!(client.base_url, "https://custom.api.com");
    }
}
