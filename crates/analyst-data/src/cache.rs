//! Response cache shared by all providers of a gateway

use analyst_core::{DataKind, Payload};
use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Cache key for one provider response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub provider: String,
    /// Canonical symbol
    pub symbol: String,
    pub kind: DataKind,
}

impl CacheKey {
    pub fn new(provider: impl Into<String>, symbol: impl Into<String>, kind: DataKind) -> Self {
        Self {
            provider: provider.into(),
            symbol: symbol.into(),
            kind,
        }
    }
}

/// Thread-safe TTL cache of successful payloads
#[derive(Clone)]
pub struct ResponseCache {
    cache: Arc<RwLock<TimedCache<CacheKey, Payload>>>,
}

impl ResponseCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Payload> {
        // TimedCache evicts on read, so lookups need the write lock
        let mut cache = self.cache.write().await;
        let hit = cache.cache_get(key).cloned();
        if hit.is_some() {
            debug!(provider = %key.provider, symbol = %key.symbol, kind = %key.kind, "Cache hit");
        }
        hit
    }

    pub async fn insert(&self, key: CacheKey, payload: Payload) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, payload);
    }

    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
