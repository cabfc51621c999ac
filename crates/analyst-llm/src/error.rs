//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LLMError {
    /// API request failed
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Invalid API key or authentication failed
    #[error("Invalid API key or authentication failed")]
    AuthenticationFailed,

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The backend is temporarily overloaded
    #[error("Backend overloaded: {0}")]
    Overloaded(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// HTTP error
    #[cfg(feature = "anthropic")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Unexpected response format
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// The model answered without any text
    #[error("Empty completion")]
    EmptyCompletion,

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Whether repeating the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_)
            | Self::Overloaded(_)
            | Self::RequestFailed(_)
            | Self::EmptyCompletion => true,
            #[cfg(feature = "anthropic")]
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LLMError::RateLimitExceeded("slow down".into()).is_transient());
        assert!(LLMError::EmptyCompletion.is_transient());
        assert!(!LLMError::AuthenticationFailed.is_transient());
        assert!(!LLMError::ModelNotFound("x".into()).is_transient());
    }
}
