//! Time-windowed duplicate suppression
//!
//! A `DelayLimiter` remembers keys it has accepted for a fixed TTL. While a
//! key is remembered, further `should_invoke` calls for it return `false`.
//! Capacity is bounded: once `cardinality` keys are held, the least recently
//! used keys are evicted and become eligible again early. A newly accepted
//! key is always admitted.
//!
//! `invalidate` forgets a key immediately. Callers use it to undo an
//! acceptance whose side effect did not happen (e.g. a failed write).

use std::hash::Hash;
use std::time::Duration;

use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use crate::core::constants::{DEFAULT_AUTOCOMPLETE_CARDINALITY, DEFAULT_AUTOCOMPLETE_TTL_SECS};

pub struct DelayLimiter<K> {
    cache: Cache<K, ()>,
    ttl: Duration,
    cardinality: u64,
}

impl<K> std::fmt::Debug for DelayLimiter<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayLimiter")
            .field("ttl", &self.ttl)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// Builder for [`DelayLimiter`]
#[derive(Debug, Clone)]
pub struct DelayLimiterBuilder {
    ttl: Duration,
    cardinality: u64,
}

impl Default for DelayLimiterBuilder {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_AUTOCOMPLETE_TTL_SECS),
            cardinality: DEFAULT_AUTOCOMPLETE_CARDINALITY,
        }
    }
}

impl DelayLimiterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long an accepted key suppresses duplicates
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Maximum number of keys remembered at once
    pub fn cardinality(mut self, cardinality: u64) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn build<K>(self) -> DelayLimiter<K>
    where
        K: Hash + Eq + Clone + Send + Sync + 'static,
    {
        tracing::debug!(
            ttl_secs = self.ttl.as_secs(),
            cardinality = self.cardinality,
            "Initializing delay limiter"
        );

        let cache = Cache::builder()
            .eviction_policy(EvictionPolicy::lru())
            .max_capacity(self.cardinality)
            .initial_capacity((self.cardinality as usize / 4).min(10_000))
            .time_to_live(self.ttl)
            .build();

        DelayLimiter {
            cache,
            ttl: self.ttl,
            cardinality: self.cardinality,
        }
    }
}

impl<K> DelayLimiter<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    /// Returns `true` and records `key` if it is not currently suppressed.
    ///
    /// Atomic per key: of any number of concurrent calls for the same absent
    /// key, exactly one returns `true`.
    pub fn should_invoke(&self, key: &K) -> bool {
        self.cache.entry_by_ref(key).or_insert(()).is_fresh()
    }

    /// Forget `key` so the next `should_invoke` for it returns `true`.
    pub fn invalidate(&self, key: &K) {
        self.cache.invalidate(key);
    }

    /// Approximate number of remembered keys
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
