//! Finnhub company news provider

use super::{per_minute, SharedRateLimiter};
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::provider::{request_error, status_error, truncate, DataProvider};
use analyst_core::{DataKind, FetchError, Market, Payload, Ticker};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BASE_URL: &str = "https://finnhub.io/api/v1";

/// Articles kept per fetch, newest first
const MAX_ARTICLES: usize = 10;

/// Finnhub news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Publish time (UNIX timestamp)
    pub datetime: i64,
    pub headline: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
}

/// Finnhub client (requires `FINNHUB_API_KEY`)
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    news_days: u32,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubProvider {
    pub fn new(api_key: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.provider_timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            news_days: config.news_days,
            rate_limiter: per_minute(config.finnhub_rate_limit),
        })
    }
}

#[async_trait]
impl DataProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "finnhub"
    }

    fn supports(&self, kind: DataKind) -> bool {
        kind == DataKind::News
    }

    fn supports_market(&self, market: Market) -> bool {
        market == Market::Us
    }

    #[instrument(skip(self), fields(symbol = %ticker))]
    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> std::result::Result<Payload, FetchError> {
        if !self.supports(kind) {
            return Err(FetchError::Unsupported);
        }
        self.rate_limiter.until_ready().await;

        let symbol = ticker.base();
        let to = Utc::now().date_naive();
        let from = to - Duration::days(i64::from(self.news_days));
        let (from, to) = (from.to_string(), to.to_string());

        let response = self
            .client
            .get(format!("{BASE_URL}/company-news"))
            .query(&[
                ("symbol", symbol),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("token", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, symbol));
        }

        let articles: Vec<NewsArticle> = response
            .json()
            .await
            .map_err(|e| FetchError::provider(format!("Failed to parse Finnhub response: {e}")))?;
        debug!(count = articles.len(), "Fetched Finnhub company news");

        let articles = latest_articles(articles);
        if articles.is_empty() {
            return Err(FetchError::NotFound {
                symbol: symbol.to_string(),
            });
        }

        let summary = news_summary(symbol, &articles, self.news_days);
        Ok(Payload::new(
            self.name(),
            kind,
            serde_json::json!({ "symbol": symbol, "articles": articles }),
            summary,
        ))
    }
}

/// Newest articles first, capped, with long summaries cut
fn latest_articles(mut articles: Vec<NewsArticle>) -> Vec<NewsArticle> {
    articles.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    articles.truncate(MAX_ARTICLES);
    for article in &mut articles {
        article.summary = truncate(&article.summary, 300);
    }
    articles
}

fn news_summary(symbol: &str, articles: &[NewsArticle], days: u32) -> String {
    let headlines = articles
        .iter()
        .take(5)
        .map(|a| {
            let date = DateTime::from_timestamp(a.datetime, 0)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            format!("{date} {} ({})", a.headline, a.source)
        })
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{symbol}: {} articles in the last {days} days. {headlines}",
        articles.len()
    )
}
