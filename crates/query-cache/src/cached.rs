//! Cache-aside helpers
//!
//! Collapse "check the pool, run the query on a miss, store the result" into
//! one call. Producer errors are returned untouched and never cached.
//! Concurrent misses on the same key are not coalesced: each caller runs its
//! own producer and the last completed `set` wins.

use crate::manager::QueryCacheManager;
use crate::tracker::QueryTracker;
use query_core::CacheCategory;
use serde::Serialize;
use std::future::Future;

impl QueryCacheManager {
    /// Return the cached value for `key`, or run `producer` and cache its output
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(category, key) {
            return Ok(cached);
        }

        let value = producer().await?;
        self.set(category, key, value.clone());
        Ok(value)
    }

    /// Like [`with_cache`](Self::with_cache) for lookups that may find nothing.
    ///
    /// `Ok(None)` is handed back to the caller but not cached, so a row created
    /// later is picked up on the next call.
    pub async fn with_cache_optional<T, E, F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        producer: F,
    ) -> Result<Option<T>, E>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        if let Some(cached) = self.get::<T>(category, key) {
            return Ok(Some(cached));
        }

        let value = producer().await?;
        if let Some(found) = &value {
            self.set(category, key, found.clone());
        }
        Ok(value)
    }

    /// Cache-aside with an instrumentation hook around the producer.
    ///
    /// The tracker only runs when the producer does; a hit bypasses both.
    pub async fn with_optimizations<T, E, F, Fut, Q>(
        &self,
        category: CacheCategory,
        key: &str,
        label: &str,
        tracker: &Q,
        producer: F,
    ) -> Result<T, E>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        E: Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send,
        Q: QueryTracker,
    {
        if let Some(cached) = self.get::<T>(category, key) {
            return Ok(cached);
        }

        let value = tracker.track(label, producer()).await?;
        self.set(category, key, value.clone());
        Ok(value)
    }
}
