//! LLM provider abstraction.
//!
//! Everything above this module speaks `LlmProvider`; the OpenRouter client
//! is one implementation, test mocks are another.

pub mod openrouter;

use async_trait::async_trait;

use crate::error::LlmError;

pub use openrouter::OpenRouterClient;

/// One chat message in a completion request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatMessage>, temperature: f32) -> Self {
        Self {
            messages,
            temperature,
        }
    }
}

/// Chat-completion provider seam.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion and return the assistant text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
