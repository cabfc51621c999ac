//! Concrete data provider clients

pub mod alpha_vantage;
pub mod finnhub;
pub mod price;
pub mod sec_edgar;
pub mod yahoo;

pub use alpha_vantage::AlphaVantageProvider;
pub use finnhub::FinnhubProvider;
pub use sec_edgar::SecEdgarProvider;
pub use yahoo::YahooProvider;

use crate::config::{GatewayConfig, ProviderKeys};
use crate::error::Result;
use crate::provider::DataProvider;
use analyst_core::DataKind;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::warn;

pub(crate) type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

pub(crate) fn per_minute(requests: u32) -> SharedRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

pub(crate) fn per_second(requests: u32) -> SharedRateLimiter {
    let quota = Quota::per_second(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Every provider that can run with the given credentials
///
/// Yahoo Finance and SEC EDGAR need no key. Alpha Vantage and Finnhub are
/// skipped with a warning when their key is absent.
pub fn default_providers(
    config: &GatewayConfig,
    keys: &ProviderKeys,
) -> Result<Vec<Arc<dyn DataProvider>>> {
    let mut providers: Vec<Arc<dyn DataProvider>> = vec![
        Arc::new(YahooProvider::new(config)),
        Arc::new(SecEdgarProvider::new(keys.sec_user_agent(), config)?),
    ];

    match &keys.alpha_vantage {
        Some(key) => providers.push(Arc::new(AlphaVantageProvider::new(key, config)?)),
        None => warn!("ALPHA_VANTAGE_API_KEY not set; fundamentals provider disabled"),
    }

    match &keys.finnhub {
        Some(key) => providers.push(Arc::new(FinnhubProvider::new(key, config)?)),
        None => warn!("FINNHUB_API_KEY not set; news provider disabled"),
    }

    Ok(providers)
}

/// Setup of one provider: what it serves and whether it can run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    pub name: &'static str,
    pub kinds: Vec<DataKind>,
    /// Environment variable holding the credential, if one is needed
    pub credential: Option<&'static str>,
    /// Registered by [`default_providers`] with these keys
    pub enabled: bool,
    pub rate_limit: String,
}

/// Status of every known provider for the given credentials
pub fn provider_status(config: &GatewayConfig, keys: &ProviderKeys) -> Vec<ProviderStatus> {
    vec![
        ProviderStatus {
            name: "yahoo",
            kinds: vec![DataKind::PriceHistory],
            credential: None,
            enabled: true,
            rate_limit: format!("{}/min", yahoo::RATE_LIMIT),
        },
        ProviderStatus {
            name: "sec_edgar",
            kinds: vec![DataKind::Earnings, DataKind::Filings],
            credential: None,
            enabled: true,
            rate_limit: format!("{}/s", config.sec_rate_limit),
        },
        ProviderStatus {
            name: "alpha_vantage",
            kinds: vec![DataKind::Fundamentals, DataKind::PriceHistory],
            credential: Some("ALPHA_VANTAGE_API_KEY"),
            enabled: keys.alpha_vantage.is_some(),
            rate_limit: format!("{}/min", config.alpha_vantage_rate_limit),
        },
        ProviderStatus {
            name: "finnhub",
            kinds: vec![DataKind::News],
            credential: Some("FINNHUB_API_KEY"),
            enabled: keys.finnhub.is_some(),
            rate_limit: format!("{}/min", config.finnhub_rate_limit),
        },
    ]
}
