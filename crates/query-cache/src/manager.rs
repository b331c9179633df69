//! Query cache manager: the registry of named pools and the get/set core

use crate::cache::CachePool;
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheConfig, PoolConfig};
use crate::pattern::KeyPattern;
use parking_lot::RwLock;
use query_core::CacheCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owns one bounded, expiring pool per configured category.
///
/// Construct it once at startup and share it as `Arc<QueryCacheManager>`
/// with every data-access component. Categories without a configured pool
/// are permissive misses: reads return `None`, writes and invalidations are
/// dropped, and each occurrence is logged at `warn`.
pub struct QueryCacheManager {
    pools: RwLock<BTreeMap<CacheCategory, Arc<CachePool>>>,
    enabled: bool,
    clock: Arc<dyn Clock>,
}

impl QueryCacheManager {
    /// Create a manager with the given pool table
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with the default pool table
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Create a manager reading time from `clock`
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        if let Err(e) = config.validate() {
            warn!("Invalid cache configuration: {}", e);
        }

        let pools = config
            .pools
            .into_iter()
            .map(|(category, pool)| {
                let pool = Arc::new(CachePool::new(category, pool, Arc::clone(&clock)));
                (category, pool)
            })
            .collect::<BTreeMap<_, _>>();

        info!(
            "Query cache initialised with {} pools (enabled: {})",
            pools.len(),
            config.enabled
        );

        Self {
            pools: RwLock::new(pools),
            enabled: config.enabled,
            clock,
        }
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Categories that have a pool, in declaration order
    pub fn categories(&self) -> Vec<CacheCategory> {
        self.pools.read().keys().copied().collect()
    }

    /// Look up a pool without logging
    pub fn pool(&self, category: CacheCategory) -> Option<Arc<CachePool>> {
        self.pools.read().get(&category).cloned()
    }

    /// Look up a pool, warning when the category is not configured
    fn pool_for(&self, category: CacheCategory, operation: &str) -> Option<Arc<CachePool>> {
        let pool = self.pool(category);
        if pool.is_none() {
            warn!(
                "Cache category '{}' has no pool configured; {} ignored",
                category, operation
            );
        }
        pool
    }

    /// Read a value from a pool
    pub fn get<T>(&self, category: CacheCategory, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        if !self.enabled {
            return None;
        }

        let value = self.pool_for(category, "get")?.get::<T>(key);
        debug!(
            "Cache {} for {}/{}",
            if value.is_some() { "hit" } else { "miss" },
            category,
            key
        );
        value
    }

    /// Store a value in a pool
    pub fn set<T>(&self, category: CacheCategory, key: impl Into<String>, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        if !self.enabled {
            return;
        }

        if let Some(pool) = self.pool_for(category, "set") {
            let key = key.into();
            debug!("Caching {}/{}", category, key);
            pool.insert(key, value);
        }
    }

    /// Whether a live entry exists, without affecting statistics
    pub fn contains(&self, category: CacheCategory, key: &str) -> bool {
        self.pool(category)
            .map(|pool| pool.contains(key))
            .unwrap_or(false)
    }

    /// Remove a single key
    pub fn remove(&self, category: CacheCategory, key: &str) -> bool {
        self.pool_for(category, "remove")
            .map(|pool| pool.remove(key))
            .unwrap_or(false)
    }

    /// Remove entries from a pool.
    ///
    /// Without a pattern the whole pool is cleared. With a pattern, every key
    /// matching the `*` glob is removed. A pattern that cannot be compiled
    /// falls back to clearing the whole pool so no targeted entry survives.
    /// Returns the number of removed entries.
    pub fn invalidate(&self, category: CacheCategory, pattern: Option<&str>) -> usize {
        let Some(pool) = self.pool_for(category, "invalidate") else {
            return 0;
        };

        match pattern {
            None => {
                let removed = pool.clear();
                debug!("Cleared cache pool '{}' ({} entries)", category, removed);
                removed
            }
            Some(pattern) => match KeyPattern::new(pattern) {
                Ok(compiled) => {
                    let removed = pool.remove_matching(&compiled);
                    debug!(
                        "Invalidated {} entries in '{}' matching '{}'",
                        removed, category, pattern
                    );
                    removed
                }
                Err(e) => {
                    warn!("{}; clearing cache pool '{}' instead", e, category);
                    pool.clear()
                }
            },
        }
    }

    /// Apply a new capacity/TTL to a pool, creating it if it does not exist
    pub fn reconfigure(&self, category: CacheCategory, config: PoolConfig) {
        let mut pools = self.pools.write();
        match pools.get(&category) {
            Some(pool) => pool.reconfigure(config.clone()),
            None => {
                pools.insert(
                    category,
                    Arc::new(CachePool::new(category, config.clone(), Arc::clone(&self.clock))),
                );
            }
        }
        info!(
            "Reconfigured cache pool '{}': capacity {}, ttl {}ms",
            category, config.capacity, config.ttl_ms
        );
    }

    /// Physically drop expired entries from every pool
    pub fn purge_expired(&self) -> usize {
        let pools: Vec<Arc<CachePool>> = self.pools.read().values().cloned().collect();
        let purged: usize = pools.iter().map(|pool| pool.purge_expired()).sum();
        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }
        purged
    }

    /// Empty every pool and reset all counters
    pub fn clear_all(&self) {
        let pools: Vec<Arc<CachePool>> = self.pools.read().values().cloned().collect();
        for pool in pools {
            pool.clear();
            pool.stats().reset();
        }
        info!("Cleared all cache pools");
    }

    /// Number of entries held by a pool
    pub fn len(&self, category: CacheCategory) -> usize {
        self.pool(category).map(|pool| pool.len()).unwrap_or(0)
    }

    /// True when no pool holds any entry
    pub fn is_empty(&self) -> bool {
        self.pools.read().values().all(|pool| pool.is_empty())
    }
}

impl Default for QueryCacheManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for QueryCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCacheManager")
            .field("enabled", &self.enabled)
            .field("pools", &*self.pools.read())
            .finish()
    }
}
