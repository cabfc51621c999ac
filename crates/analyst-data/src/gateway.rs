//! Data source gateway
//!
//! Fans a logical request (ticker + data kinds) out to every provider that
//! can serve it, runs the calls concurrently, and collects exactly one entry
//! per (kind, provider) pair. A provider failure never aborts the batch; it
//! becomes a recorded [`FetchError`].

use crate::cache::{CacheKey, ResponseCache};
use crate::config::{GatewayConfig, ProviderKeys};
use crate::error::{Result, SymbolError};
use crate::provider::DataProvider;
use crate::providers::default_providers;
use crate::symbol;
use analyst_core::{DataKind, FetchError, Payload, SourceKey, Ticker};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Pseudo-provider name for entries no real provider produced
pub const GATEWAY_SOURCE: &str = "gateway";

/// One (source, outcome) pair
pub type SourceResult = (SourceKey, std::result::Result<Payload, FetchError>);

/// Outcome of a [`Gateway::fetch_all`] call
#[derive(Debug, Clone, Default)]
pub struct GatewayResult {
    entries: Vec<SourceResult>,
}

impl GatewayResult {
    pub fn entries(&self) -> &[SourceResult] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<SourceResult> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Merge per kind: every payload if any provider succeeded, otherwise
    /// the first recorded error
    pub fn by_kind(&self) -> BTreeMap<DataKind, std::result::Result<Vec<Payload>, FetchError>> {
        let mut merged: BTreeMap<DataKind, std::result::Result<Vec<Payload>, FetchError>> =
            BTreeMap::new();

        for (key, outcome) in &self.entries {
            match (merged.get_mut(&key.kind), outcome) {
                (None, _) => {
                    merged.insert(key.kind, outcome.clone().map(|p| vec![p]));
                }
                (Some(Ok(payloads)), Ok(payload)) => payloads.push(payload.clone()),
                (Some(slot), Ok(payload)) => *slot = Ok(vec![payload.clone()]),
                (Some(_), Err(_)) => {}
            }
        }
        merged
    }
}

/// Uniform fetch interface over the registered providers
pub struct Gateway {
    providers: Vec<Arc<dyn DataProvider>>,
    cache: Option<ResponseCache>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    /// Gateway with every provider whose credentials are available
    pub fn from_env(config: GatewayConfig) -> Result<Self> {
        let keys = ProviderKeys::from_env();
        let providers = default_providers(&config, &keys)?;
        Gateway::builder()
            .config(config)
            .providers(providers)
            .build()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Normalize user input using the configured default market
    pub fn normalize(&self, input: &str) -> std::result::Result<Ticker, SymbolError> {
        symbol::normalize(input, self.config.default_market)
    }

    /// Fetch one kind from every provider that serves it
    pub async fn fetch(&self, ticker: &Ticker, kind: DataKind) -> Vec<SourceResult> {
        self.fetch_all(ticker, &[kind], &CancellationToken::new())
            .await
            .into_entries()
    }

    /// Fetch several kinds concurrently
    ///
    /// Never fails: every requested kind yields at least one entry. Calls
    /// still pending when `cancel` fires are recorded as timeouts.
    #[instrument(skip(self, kinds, cancel), fields(ticker = %ticker))]
    pub async fn fetch_all(
        &self,
        ticker: &Ticker,
        kinds: &[DataKind],
        cancel: &CancellationToken,
    ) -> GatewayResult {
        let started = Instant::now();
        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();

        let mut entries = Vec::new();
        let mut calls = Vec::new();
        for kind in kinds {
            let serving: Vec<_> = self
                .providers
                .iter()
                .filter(|p| p.supports(kind) && p.supports_market(ticker.market()))
                .collect();

            if serving.is_empty() {
                debug!(%kind, market = ?ticker.market(), "No provider serves this kind");
                entries.push((
                    SourceKey::new(kind, GATEWAY_SOURCE),
                    Err(FetchError::Unsupported),
                ));
                continue;
            }

            for provider in serving {
                calls.push(self.call(Arc::clone(provider), ticker, kind, cancel, started));
            }
        }

        entries.extend(join_all(calls).await);

        let result = GatewayResult { entries };
        info!(
            succeeded = result.succeeded(),
            failed = result.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gateway fetch settled"
        );
        result
    }

    async fn call(
        &self,
        provider: Arc<dyn DataProvider>,
        ticker: &Ticker,
        kind: DataKind,
        cancel: &CancellationToken,
        started: Instant,
    ) -> SourceResult {
        let key = SourceKey::new(kind, provider.name());
        if cancel.is_cancelled() {
            return (key, Err(FetchError::Cancelled));
        }

        let cache_key = CacheKey::new(provider.name(), ticker.canonical(), kind);
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&cache_key).await
        {
            return (key, Ok(hit));
        }

        let limit = self.config.provider_timeout;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Timeout { after: started.elapsed() }),
            result = tokio::time::timeout(limit, provider.fetch(ticker, kind)) => {
                result.unwrap_or(Err(FetchError::Timeout { after: limit }))
            }
        };

        match &outcome {
            Ok(payload) => {
                debug!(source = %key, bytes = payload.body.to_string().len(), "Provider fetch succeeded");
                if let Some(cache) = &self.cache {
                    cache.insert(cache_key, payload.clone()).await;
                }
            }
            Err(error) => warn!(source = %key, %error, "Provider fetch failed"),
        }
        (key, outcome)
    }
}

/// Builder for Gateway
#[derive(Default)]
pub struct GatewayBuilder {
    providers: Vec<Arc<dyn DataProvider>>,
    config: Option<GatewayConfig>,
}

impl GatewayBuilder {
    pub fn provider(mut self, provider: Arc<dyn DataProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: impl IntoIterator<Item = Arc<dyn DataProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        if self.providers.is_empty() {
            warn!("Gateway built without providers; every fetch will be unsupported");
        }

        let cache = config
            .cache_enabled
            .then(|| ResponseCache::new(config.cache_ttl));

        Ok(Gateway {
            providers: self.providers,
            cache,
            config,
        })
    }
}
