//! Answer generation against the completion service.
//!
//! One request per call, no internal retries — retry is the job queue's
//! responsibility.

use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient, OpenAIError};
use thiserror::Error;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on \
                             provided website content. Be concise and accurate.";

const MAX_ANSWER_TOKENS: u32 = 1000;
const ANSWER_TEMPERATURE: f32 = 0.7;

/// Completion-service failure.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingCredential,

    #[error("OpenAI API error: {0}")]
    Api(String),

    #[error("OpenAI request failed: {0}")]
    Network(String),

    #[error("no response from OpenAI API")]
    EmptyAnswer,
}

impl From<OpenAIError> for GenerationError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Config(_) => GenerationError::MissingCredential,
            OpenAIError::Api { .. } => GenerationError::Api(err.to_string()),
            OpenAIError::Network(e) => GenerationError::Network(e),
            OpenAIError::Parse(e) => GenerationError::Api(e),
        }
    }
}

/// Trait seam for answer generation, mockable in tests.
#[async_trait]
pub trait BaseAnswerGenerator: Send + Sync {
    /// Answer a question from extracted page content.
    async fn answer(&self, content: &str, question: &str) -> Result<String, GenerationError>;
}

/// Answer generator backed by the OpenAI chat-completions API.
pub struct OpenAiAnswerer {
    client: Option<OpenAIClient>,
    model: String,
}

impl OpenAiAnswerer {
    /// A missing API key is deferred to call time so the server can start
    /// without a credential.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: api_key.map(OpenAIClient::new),
            model: model.into(),
        }
    }

    fn user_prompt(content: &str, question: &str) -> String {
        format!(
            "Website Content:\n{content}\n\nQuestion: {question}\n\n\
             Please answer the question based on the website content provided."
        )
    }
}

#[async_trait]
impl BaseAnswerGenerator for OpenAiAnswerer {
    async fn answer(&self, content: &str, question: &str) -> Result<String, GenerationError> {
        let client = self
            .client
            .as_ref()
            .ok_or(GenerationError::MissingCredential)?;

        let request = ChatRequest::new(self.model.as_str())
            .message(Message::system(SYSTEM_PROMPT))
            .message(Message::user(Self::user_prompt(content, question)))
            .max_tokens(MAX_ANSWER_TOKENS)
            .temperature(ANSWER_TEMPERATURE);

        let response = client.chat_completion(request).await?;

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(GenerationError::EmptyAnswer);
        }

        debug!(model = %self.model, answer_len = answer.len(), "generated answer");
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_prompt_embeds_content_and_question() {
        let prompt = OpenAiAnswerer::user_prompt("page text here", "What is this?");

        assert!(prompt.starts_with("Website Content:\npage text here"));
        assert!(prompt.contains("Question: What is this?"));
    }

    #[tokio::test]
    async fn test_missing_credential_fails_without_a_request() {
        let answerer = OpenAiAnswerer::new(None, "gpt-4o-mini");
        let err = answerer.answer("content", "question").await.unwrap_err();

        assert!(matches!(err, GenerationError::MissingCredential));
    }

    #[test]
    fn test_api_error_mapping_keeps_embedded_message() {
        let err = GenerationError::from(OpenAIError::Api {
            status: 429,
            message: "Rate limit reached".to_string(),
        });

        assert_eq!(err.to_string(), "OpenAI API error: 429 - Rate limit reached");
    }
}
