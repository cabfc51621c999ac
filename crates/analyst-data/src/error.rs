//! Error types for the data gateway
//!
//! Per-call provider failures are [`FetchError`](analyst_core::FetchError)
//! values recorded in the analysis state. The types here cover what can go
//! wrong before any call is made: bad symbols and bad configuration.

use thiserror::Error;

/// Rejected ticker input
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    /// Nothing left after trimming and prefix stripping
    #[error("empty symbol")]
    Empty,

    /// The symbol contains a character no exchange uses
    #[error("invalid character {ch:?} in symbol {symbol}")]
    InvalidCharacter { symbol: String, ch: char },

    /// Longer than any listed symbol
    #[error("symbol too long: {0}")]
    TooLong(String),
}

/// Data gateway errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(#[from] SymbolError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client could not be built
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DataError::from(SymbolError::InvalidCharacter {
            symbol: "AB$C".to_string(),
            ch: '$',
        });
        assert_eq!(err.to_string(), "Invalid symbol: invalid character '$' in symbol AB$C");

        let err = DataError::ConfigError("provider_timeout must be greater than 0".into());
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
