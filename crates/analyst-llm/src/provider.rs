//! LLM provider trait definition

use crate::{CompletionRequest, CompletionResponse, LLMError, Message, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Trait for LLM providers
///
/// Implementations give access to one LLM service. Every research node
/// depends only on this shape.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion from the LLM
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Get the provider name (e.g., "anthropic")
    fn name(&self) -> &str;
}

/// A single-turn prompt: system context plus user text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2048,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the completion request for a model
    pub fn to_request(&self, model: &str) -> CompletionRequest {
        let mut builder = CompletionRequest::builder(model)
            .system(self.system.clone())
            .add_message(Message::user(self.user.clone()))
            .max_tokens(self.max_tokens);
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        builder.build()
    }
}

/// Run a prompt and return the completion text
///
/// Fails with [`LLMError::EmptyCompletion`] when the answer holds no text.
pub async fn complete_text(
    provider: &dyn LLMProvider,
    model: &str,
    prompt: &Prompt,
) -> Result<String> {
    let response = provider.complete(prompt.to_request(model)).await?;
    debug!(
        provider = provider.name(),
        tokens = response.usage.total(),
        stop_reason = ?response.stop_reason,
        "completion received"
    );

    match response.message.text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(LLMError::EmptyCompletion),
    }
}
