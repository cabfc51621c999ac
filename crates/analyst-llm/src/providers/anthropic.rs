//! Anthropic Claude provider implementation
//!
//! See: https://docs.anthropic.com/en/api/messages

use crate::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    MessageContent, Result, Role, StopReason, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Default model used when `ANALYST_MODEL` is not set
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_BASE.to_string(),
        })
    }

    /// Create a provider from the `ANTHROPIC_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            LLMError::ConfigurationError(format!("{API_KEY_ENV} environment variable not set"))
        })?;
        if api_key.trim().is_empty() {
            return Err(LLMError::ConfigurationError(format!("{API_KEY_ENV} is empty")));
        }
        Self::new(api_key)
    }

    /// Whether [`from_env`](Self::from_env) would find a key
    pub fn key_configured() -> bool {
        std::env::var(API_KEY_ENV).is_ok_and(|key| !key.trim().is_empty())
    }

    /// Point the provider at a different API base (proxies, gateways)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!("Sending request to Anthropic API");

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;

            return Err(match status.as_u16() {
                401 => LLMError::AuthenticationFailed,
                429 => LLMError::RateLimitExceeded(error_text),
                529 => LLMError::Overloaded(error_text),
                400 => LLMError::InvalidRequest(error_text),
                404 => LLMError::ModelNotFound(request.model),
                _ => LLMError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let anthropic_response: AnthropicResponse = response.json().await.map_err(|e| {
            LLMError::UnexpectedResponse(format!("Failed to parse response: {e}"))
        })?;

        debug!(
            "Received response - stop_reason: {}, tokens: {}/{}",
            anthropic_response.stop_reason,
            anthropic_response.usage.input_tokens,
            anthropic_response.usage.output_tokens
        );

        Ok(anthropic_response.into_completion())
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    stop_reason: String,
    usage: UsageResponse,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    input_tokens: usize,
    output_tokens: usize,
}

impl AnthropicResponse {
    fn into_completion(self) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: MessageContent::Blocks(self.content),
            },
            stop_reason: match self.stop_reason.as_str() {
                "max_tokens" => StopReason::MaxTokens,
                "stop_sequence" => StopReason::StopSequence,
                "end_turn" => StopReason::EndTurn,
                other => {
                    debug!("Unknown stop reason: {other}");
                    StopReason::EndTurn
                }
            },
            usage: TokenUsage {
                input_tokens: self.usage.input_tokens,
                output_tokens: self.usage.output_tokens,
            },
        }
    }
}
