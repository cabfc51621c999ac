//! Data source gateway for analyst-rs
//!
//! This crate turns a user-supplied ticker into a canonical [`Ticker`] and
//! fans research requests out to external market data providers:
//!
//! - Yahoo Finance: daily price history for every supported market
//! - Alpha Vantage: company fundamentals and daily prices (API key)
//! - SEC EDGAR: recent filings and reported earnings for US listings
//! - Finnhub: company news for US listings (API key)
//!
//! Provider calls run concurrently, are rate limited per provider, bounded
//! by a per-call timeout, and cached for a short TTL. Every failure is a
//! recorded [`FetchError`] rather than an aborted batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use analyst_data::{Gateway, GatewayConfig};
//! use analyst_core::DataKind;
//! use tokio_util::sync::CancellationToken;
//!
//! let gateway = Gateway::from_env(GatewayConfig::default())?;
//! let ticker = gateway.normalize("RELIANCE.NS")?;
//! let result = gateway
//!     .fetch_all(&ticker, &DataKind::ALL, &CancellationToken::new())
//!     .await;
//! println!("{} of {} sources succeeded", result.succeeded(), result.len());
//! ```
//!
//! [`Ticker`]: analyst_core::Ticker
//! [`FetchError`]: analyst_core::FetchError

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod providers;
pub mod quality;
pub mod symbol;

pub use cache::{CacheKey, ResponseCache};
pub use config::{GatewayConfig, GatewayConfigBuilder, ProviderKeys, DEFAULT_SEC_USER_AGENT};
pub use error::{DataError, Result, SymbolError};
pub use gateway::{Gateway, GatewayBuilder, GatewayResult, SourceResult, GATEWAY_SOURCE};
pub use provider::DataProvider;
pub use providers::{
    default_providers, provider_status, AlphaVantageProvider, FinnhubProvider, ProviderStatus,
    SecEdgarProvider, YahooProvider,
};
pub use quality::{CoverageStatus, DataCoverage};
pub use symbol::normalize;
