//! In-memory cache for aggregated results.
//!
//! Aggregators consult a [`ResultCache`] before doing any I/O and store
//! what they fetched afterwards. Uses [`moka`] for async-friendly caching
//! with a configurable TTL and automatic eviction. A TTL of zero yields a
//! disabled cache that never hits.

use std::time::Duration;

use moka::future::Cache;

use crate::config::FetchConfig;

/// Maximum number of cached result sets per cache.
const MAX_CACHE_ENTRIES: u64 = 256;

/// Composite cache key: namespace + normalised subject + variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Plan or source name.
    namespace: String,
    /// Lowercased, trimmed entity id or query.
    subject: String,
    /// Anything else that changes the result, e.g. the desired count.
    variant: String,
}

impl CacheKey {
    /// Build a deterministic cache key.
    ///
    /// The subject is lowercased and trimmed so `" Rust "` and `"rust"`
    /// share an entry.
    pub fn new(namespace: &str, subject: &str, variant: impl ToString) -> Self {
        Self {
            namespace: namespace.to_string(),
            subject: subject.trim().to_lowercase(),
            variant: variant.to_string(),
        }
    }
}

/// Optional cache-or-fetch store for aggregated results.
#[derive(Clone)]
pub struct ResultCache<V: Clone + Send + Sync + 'static> {
    inner: Option<Cache<CacheKey, V>>,
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// A cache whose entries expire after `ttl`. A zero TTL disables it.
    pub fn new(ttl: Duration) -> Self {
        if ttl.is_zero() {
            return Self::disabled();
        }
        Self {
            inner: Some(
                Cache::builder()
                    .max_capacity(MAX_CACHE_ENTRIES)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    /// A cache using `cache_ttl_seconds` from `config`.
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(Duration::from_secs(config.cache_ttl_seconds))
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Whether lookups can ever hit.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Look up a cached value. Always `None` when disabled.
    pub async fn get(&self, key: &CacheKey) -> Option<V> {
        match self.inner {
            Some(ref cache) => cache.get(key).await,
            None => None,
        }
    }

    /// Store a value. No-op when disabled.
    pub async fn insert(&self, key: CacheKey, value: V) {
        if let Some(ref cache) = self.inner {
            cache.insert(key, value).await;
        }
    }
}

impl<V: Clone + Send + Sync + 'static> std::fmt::Debug for ResultCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
