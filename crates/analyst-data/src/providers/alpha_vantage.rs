//! Alpha Vantage fundamentals and daily price provider

use super::price::{price_body, PriceBar, PriceStats};
use super::{per_minute, SharedRateLimiter};
use crate::config::GatewayConfig;
use crate::error::Result;
use crate::provider::{request_error, status_error, DataProvider};
use analyst_core::{DataKind, FetchError, Market, Payload, Ticker};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Alpha Vantage client (requires `ALPHA_VANTAGE_API_KEY`)
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

/// Company overview fields used in the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    #[serde(rename = "MarketCapitalization")]
    pub market_cap: Option<String>,
    #[serde(rename = "PERatio")]
    pub pe_ratio: Option<String>,
    #[serde(rename = "PEGRatio")]
    pub peg_ratio: Option<String>,
    #[serde(rename = "EPS")]
    pub eps: Option<String>,
    pub book_value: Option<String>,
    pub dividend_yield: Option<String>,
    pub profit_margin: Option<String>,
    #[serde(rename = "ReturnOnEquityTTM")]
    pub return_on_equity: Option<String>,
    #[serde(rename = "RevenueTTM")]
    pub revenue_ttm: Option<String>,
    #[serde(rename = "QuarterlyRevenueGrowthYOY")]
    pub revenue_growth_yoy: Option<String>,
    pub analyst_target_price: Option<String>,
    pub beta: Option<String>,
    #[serde(rename = "52WeekHigh")]
    pub week_52_high: Option<String>,
    #[serde(rename = "52WeekLow")]
    pub week_52_low: Option<String>,
}

impl CompanyOverview {
    fn summary(&self) -> String {
        let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        format!(
            "{} ({} / {}): market cap {}, P/E {}, PEG {}, EPS {}, dividend yield {}, profit margin {}, ROE {}, revenue growth YoY {}, analyst target {}",
            self.name,
            field(&self.sector),
            field(&self.industry),
            field(&self.market_cap),
            field(&self.pe_ratio),
            field(&self.peg_ratio),
            field(&self.eps),
            field(&self.dividend_yield),
            field(&self.profit_margin),
            field(&self.return_on_equity),
            field(&self.revenue_growth_yoy),
            field(&self.analyst_target_price),
        )
    }
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>, config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.provider_timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            rate_limiter: per_minute(config.alpha_vantage_rate_limit),
        })
    }

    /// Alpha Vantage symbol for a ticker, if its market is covered
    fn symbol(ticker: &Ticker) -> Option<String> {
        let suffix = match ticker.market() {
            Market::Us => "",
            Market::Bse => ".BSE",
            Market::London => ".LON",
            Market::Toronto => ".TRT",
            Market::Xetra => ".DEX",
            _ => return None,
        };
        Some(format!("{}{suffix}", ticker.base()))
    }

    async fn query(&self, function: &str, symbol: &str) -> std::result::Result<serde_json::Value, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(BASE_URL)
            .query(&[("function", function), ("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| request_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, symbol));
        }

        let data: serde_json::Value = response.json().await.map_err(|e| {
            FetchError::provider(format!("Failed to parse Alpha Vantage response: {e}"))
        })?;
        check_api_message(&data, symbol)?;
        Ok(data)
    }
}

#[async_trait]
impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "alpha_vantage"
    }

    fn supports(&self, kind: DataKind) -> bool {
        matches!(kind, DataKind::Fundamentals | DataKind::PriceHistory)
    }

    fn supports_market(&self, market: Market) -> bool {
        matches!(
            market,
            Market::Us | Market::Bse | Market::London | Market::Toronto | Market::Xetra
        )
    }

    #[instrument(skip(self), fields(symbol = %ticker))]
    async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> std::result::Result<Payload, FetchError> {
        let symbol = Self::symbol(ticker).ok_or(FetchError::Unsupported)?;

        match kind {
            DataKind::Fundamentals => {
                let data = self.query("OVERVIEW", &symbol).await?;
                let overview = parse_overview(data, &symbol)?;
                debug!(name = %overview.name, "Fetched company overview");
                let summary = overview.summary();
                let body = serde_json::to_value(&overview)
                    .map_err(|e| FetchError::provider(e.to_string()))?;
                Ok(Payload::new(self.name(), kind, body, summary))
            }
            DataKind::PriceHistory => {
                let data = self.query("TIME_SERIES_DAILY", &symbol).await?;
                let bars = parse_daily(&data, &symbol)?;
                let stats = PriceStats::from_bars(&bars).ok_or_else(|| FetchError::NotFound {
                    symbol: symbol.clone(),
                })?;
                let currency = ticker.market().currency();
                Ok(Payload::new(
                    self.name(),
                    kind,
                    price_body(&symbol, currency, &bars, &stats),
                    stats.summary(&symbol, currency),
                ))
            }
            _ => Err(FetchError::Unsupported),
        }
    }
}

/// Alpha Vantage reports errors and throttling inside a 200 response
fn check_api_message(data: &serde_json::Value, symbol: &str) -> std::result::Result<(), FetchError> {
    if data.get("Error Message").is_some() {
        return Err(FetchError::NotFound {
            symbol: symbol.to_string(),
        });
    }
    if data.get("Note").is_some() {
        return Err(FetchError::RateLimited);
    }
    if let Some(info) = data.get("Information").and_then(|v| v.as_str()) {
        let lower = info.to_lowercase();
        if lower.contains("rate limit") || lower.contains("requests per") {
            return Err(FetchError::RateLimited);
        }
        return Err(FetchError::provider(info.to_string()));
    }
    Ok(())
}

fn parse_overview(data: serde_json::Value, symbol: &str) -> std::result::Result<CompanyOverview, FetchError> {
    // Unknown symbols come back as an empty object
    if data.as_object().is_none_or(serde_json::Map::is_empty) {
        return Err(FetchError::NotFound {
            symbol: symbol.to_string(),
        });
    }
    serde_json::from_value(data)
        .map_err(|e| FetchError::provider(format!("Unexpected overview shape: {e}")))
}

/// Parse `Time Series (Daily)` into bars in ascending date order
fn parse_daily(data: &serde_json::Value, symbol: &str) -> std::result::Result<Vec<PriceBar>, FetchError> {
    let series = data
        .get("Time Series (Daily)")
        .and_then(|s| s.as_object())
        .ok_or_else(|| FetchError::NotFound {
            symbol: symbol.to_string(),
        })?;

    let number = |values: &serde_json::Value, field: &str| -> f64 {
        values[field]
            .as_str()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0)
    };

    let mut bars: Vec<PriceBar> = series
        .iter()
        .map(|(date, values)| PriceBar {
            date: date.clone(),
            open: number(values, "1. open"),
            high: number(values, "2. high"),
            low: number(values, "3. low"),
            close: number(values, "4. close"),
            volume: values["5. volume"]
                .as_str()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        })
        .collect();
    bars.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(bars)
}
