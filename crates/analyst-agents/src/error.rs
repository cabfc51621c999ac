//! Error types for the research entry point

use analyst_core::{AnalysisState, FaultKind};
use analyst_data::{DataError, SymbolError};
use analyst_llm::LLMError;
use analyst_workflow::ConfigError;
use thiserror::Error;

/// Errors returned by [`EquityResearcher`](crate::EquityResearcher)
#[derive(Error, Debug)]
pub enum ResearchError {
    /// The run ended without a usable report
    ///
    /// Carries the final state so callers can inspect what was gathered.
    #[error("research failed ({kind}): {message}")]
    Fatal {
        kind: FaultKind,
        message: String,
        state: Box<AnalysisState>,
    },

    #[error("invalid ticker: {0}")]
    InvalidTicker(#[from] SymbolError),

    /// Bad options or a collaborator that could not be built
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<ConfigError> for ResearchError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<DataError> for ResearchError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidSymbol(symbol) => Self::InvalidTicker(symbol),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<LLMError> for ResearchError {
    fn from(err: LLMError) -> Self {
        Self::Config(err.to_string())
    }
}

/// A prompt template failed to render
#[derive(Error, Debug)]
#[error("failed to render prompt {name}: {detail}")]
pub struct PromptError {
    pub name: &'static str,
    pub detail: String,
}

/// Result type alias for research operations
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err = ResearchError::from(DataError::InvalidSymbol(SymbolError::Empty));
        assert!(matches!(err, ResearchError::InvalidTicker(SymbolError::Empty)));
        assert_eq!(err.to_string(), "invalid ticker: empty symbol");

        let err = ResearchError::from(ConfigError::ZeroIterations);
        assert_eq!(
            err.to_string(),
            "configuration error: max_iterations must be at least 1"
        );

        let err = ResearchError::from(LLMError::ConfigurationError(
            "ANTHROPIC_API_KEY not set".into(),
        ));
        assert!(matches!(err, ResearchError::Config(_)));
    }
}
