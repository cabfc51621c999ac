//! Data provider trait definition

use analyst_core::{DataKind, FetchError, Market, Payload, Ticker};
use async_trait::async_trait;
use reqwest::StatusCode;

/// A single market data, news, or filing source
///
/// The gateway depends only on this shape. Implementations return a
/// [`FetchError`] for every failure and never panic on bad upstream data.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Stable provider name, used as the source key in raw data
    fn name(&self) -> &str;

    /// Whether the provider can serve this kind of data
    fn supports(&self, kind: DataKind) -> bool;

    /// Whether the provider covers symbols listed on this market
    fn supports_market(&self, _market: Market) -> bool {
        true
    }

    /// Fetch one kind of data for a ticker
    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> Result<Payload, FetchError>;
}

/// Map a non-success HTTP status to a fetch error
pub(crate) fn status_error(status: StatusCode, body: &str, symbol: &str) -> FetchError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
        StatusCode::NOT_FOUND => FetchError::NotFound {
            symbol: symbol.to_string(),
        },
        _ => FetchError::provider(format!("HTTP {status}: {}", truncate(body, 200))),
    }
}

/// Map a transport error to a fetch error
pub(crate) fn request_error(err: &reqwest::Error) -> FetchError {
    if err.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        return FetchError::RateLimited;
    }
    FetchError::provider(format!("request failed: {err}"))
}

/// Cut text to at most `max` characters, appending an ellipsis when cut
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
