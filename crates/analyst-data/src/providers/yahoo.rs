//! Yahoo Finance price history provider

use super::price::{price_body, PriceBar, PriceStats};
use super::{per_minute, SharedRateLimiter};
use crate::config::GatewayConfig;
use crate::provider::DataProvider;
use analyst_core::{DataKind, FetchError, Payload, Ticker};
use async_trait::async_trait;
use chrono::DateTime;
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

/// Requests per minute; Yahoo publishes no quota
pub(crate) const RATE_LIMIT: u32 = 60;

/// Daily quotes from Yahoo Finance (no API key required)
///
/// Covers every market with a Yahoo suffix, which is the canonical symbol
/// form, so no remapping is needed.
pub struct YahooProvider {
    history_days: u32,
    rate_limiter: SharedRateLimiter,
}

impl YahooProvider {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            history_days: config.history_days,
            rate_limiter: per_minute(RATE_LIMIT),
        }
    }
}

#[async_trait]
impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn supports(&self, kind: DataKind) -> bool {
        kind == DataKind::PriceHistory
    }

    #[instrument(skip(self), fields(symbol = %ticker))]
    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> Result<Payload, FetchError> {
        if !self.supports(kind) {
            return Err(FetchError::Unsupported);
        }
        self.rate_limiter.until_ready().await;

        let symbol = ticker.canonical();
        let connector =
            yahoo::YahooConnector::new().map_err(|e| FetchError::provider(e.to_string()))?;

        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(i64::from(self.history_days));

        let response = connector
            .get_quote_history(&symbol, start, end)
            .await
            .map_err(|e| yahoo_error(&symbol, &e.to_string()))?;
        let quotes = response
            .quotes()
            .map_err(|e| yahoo_error(&symbol, &e.to_string()))?;

        let bars: Vec<PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let timestamp = i64::try_from(q.timestamp).ok()?;
                let date = DateTime::from_timestamp(timestamp, 0)?;
                Some(PriceBar {
                    date: date.format("%Y-%m-%d").to_string(),
                    open: q.open,
                    high: q.high,
                    low: q.low,
                    close: q.close,
                    volume: q.volume,
                })
            })
            .collect();

        let stats = PriceStats::from_bars(&bars).ok_or_else(|| FetchError::NotFound {
            symbol: symbol.clone(),
        })?;
        debug!(bars = bars.len(), "Fetched Yahoo price history");

        let currency = ticker.market().currency();
        Ok(Payload::new(
            self.name(),
            kind,
            price_body(&symbol, currency, &bars, &stats),
            stats.summary(&symbol, currency),
        ))
    }
}

/// Classify a Yahoo client error message
fn yahoo_error(symbol: &str, message: &str) -> FetchError {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("too many") {
        FetchError::RateLimited
    } else if lower.contains("not found")
        || lower.contains("no data")
        || lower.contains("no quotes")
        || lower.contains("no result")
    {
        FetchError::NotFound {
            symbol: symbol.to_string(),
        }
    } else {
        FetchError::provider(format!("Yahoo Finance: {message}"))
    }
}
