//! Chat-completion client used to generate tasks.
//!
//! [`LlmClient`] is the seam the pipeline depends on; [`XaiClient`] speaks the
//! OpenAI-compatible wire format xAI exposes.

mod error;
mod xai;

pub use error::{LlmError, LlmErrorKind};
pub use xai::{XaiClient, XAI_API_BASE_URL};

use async_trait::async_trait;
use serde::Serialize;

/// Author of a prompt message. Only user prompts are sent.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
}

/// One message of the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A completion as returned by the provider.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// `None` when the provider answered without text
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Request parameters beyond model and messages.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Cap on generated tokens; provider default when unset
    pub max_tokens: Option<u64>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Request one completion. Failures are returned, never retried.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError>;
}
