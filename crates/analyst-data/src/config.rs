//! Configuration for the data gateway and its providers

use crate::error::{DataError, Result};
use analyst_core::Market;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// User agent sent to SEC EDGAR when `SEC_USER_AGENT` is not set
pub const DEFAULT_SEC_USER_AGENT: &str = "analyst-rs (analyst-rs@example.com)";

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Market assumed for symbols without an exchange suffix or prefix
    pub default_market: Market,

    /// Upper bound for a single provider call
    pub provider_timeout: Duration,

    /// Cache successful payloads
    pub cache_enabled: bool,

    /// How long cached payloads stay valid
    pub cache_ttl: Duration,

    /// Days of daily price history to request
    pub history_days: u32,

    /// Days of company news to request
    pub news_days: u32,

    /// Most recent filings to scan for relevant forms
    pub filings_window: usize,

    /// Alpha Vantage requests per minute (free tier: 5)
    pub alpha_vantage_rate_limit: u32,

    /// Finnhub requests per minute (free tier: 60)
    pub finnhub_rate_limit: u32,

    /// SEC EDGAR requests per second (fair access policy: 10)
    pub sec_rate_limit: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_market: Market::Us,
            provider_timeout: Duration::from_secs(20),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
            history_days: 365,
            news_days: 30,
            filings_window: 20,
            alpha_vantage_rate_limit: 5,
            finnhub_rate_limit: 60,
            sec_rate_limit: 10,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration builder
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider_timeout.is_zero() {
            return Err(DataError::ConfigError(
                "provider_timeout must be greater than 0".to_string(),
            ));
        }

        if self.history_days == 0 || self.news_days == 0 {
            return Err(DataError::ConfigError(
                "history_days and news_days must be greater than 0".to_string(),
            ));
        }

        if self.filings_window == 0 {
            return Err(DataError::ConfigError(
                "filings_window must be greater than 0".to_string(),
            ));
        }

        if self.alpha_vantage_rate_limit == 0
            || self.finnhub_rate_limit == 0
            || self.sec_rate_limit == 0
        {
            return Err(DataError::ConfigError(
                "rate limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for GatewayConfig
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    default_market: Option<Market>,
    provider_timeout: Option<Duration>,
    cache_enabled: Option<bool>,
    cache_ttl: Option<Duration>,
    history_days: Option<u32>,
    news_days: Option<u32>,
    filings_window: Option<usize>,
    alpha_vantage_rate_limit: Option<u32>,
    finnhub_rate_limit: Option<u32>,
    sec_rate_limit: Option<u32>,
}

impl GatewayConfigBuilder {
    pub fn default_market(mut self, market: Market) -> Self {
        self.default_market = Some(market);
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    pub fn history_days(mut self, days: u32) -> Self {
        self.history_days = Some(days);
        self
    }

    pub fn news_days(mut self, days: u32) -> Self {
        self.news_days = Some(days);
        self
    }

    pub fn filings_window(mut self, window: usize) -> Self {
        self.filings_window = Some(window);
        self
    }

    pub fn alpha_vantage_rate_limit(mut self, per_minute: u32) -> Self {
        self.alpha_vantage_rate_limit = Some(per_minute);
        self
    }

    pub fn finnhub_rate_limit(mut self, per_minute: u32) -> Self {
        self.finnhub_rate_limit = Some(per_minute);
        self
    }

    pub fn sec_rate_limit(mut self, per_second: u32) -> Self {
        self.sec_rate_limit = Some(per_second);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<GatewayConfig> {
        let defaults = GatewayConfig::default();

        let config = GatewayConfig {
            default_market: self.default_market.unwrap_or(defaults.default_market),
            provider_timeout: self.provider_timeout.unwrap_or(defaults.provider_timeout),
            cache_enabled: self.cache_enabled.unwrap_or(defaults.cache_enabled),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            history_days: self.history_days.unwrap_or(defaults.history_days),
            news_days: self.news_days.unwrap_or(defaults.news_days),
            filings_window: self.filings_window.unwrap_or(defaults.filings_window),
            alpha_vantage_rate_limit: self
                .alpha_vantage_rate_limit
                .unwrap_or(defaults.alpha_vantage_rate_limit),
            finnhub_rate_limit: self.finnhub_rate_limit.unwrap_or(defaults.finnhub_rate_limit),
            sec_rate_limit: self.sec_rate_limit.unwrap_or(defaults.sec_rate_limit),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Provider credentials
///
/// A provider whose key is missing is simply not registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderKeys {
    pub alpha_vantage: Option<String>,
    pub finnhub: Option<String>,
    pub sec_user_agent: Option<String>,
}

impl ProviderKeys {
    /// Read `ALPHA_VANTAGE_API_KEY`, `FINNHUB_API_KEY` and `SEC_USER_AGENT`
    pub fn from_env() -> Self {
        let keys = Self {
            alpha_vantage: non_empty_var("ALPHA_VANTAGE_API_KEY"),
            finnhub: non_empty_var("FINNHUB_API_KEY"),
            sec_user_agent: non_empty_var("SEC_USER_AGENT"),
        };
        debug!(
            alpha_vantage = keys.alpha_vantage.is_some(),
            finnhub = keys.finnhub.is_some(),
            sec_user_agent = keys.sec_user_agent.is_some(),
            "Loaded provider keys from environment"
        );
        keys
    }

    /// SEC user agent, falling back to the built-in default
    pub fn sec_user_agent(&self) -> &str {
        self.sec_user_agent
            .as_deref()
            .unwrap_or(DEFAULT_SEC_USER_AGENT)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
