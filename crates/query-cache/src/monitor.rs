//! Per-pool diagnostics for cache tuning

use crate::cache::CachePool;
use crate::manager::QueryCacheManager;
use query_core::CacheCategory;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Pools below this hit rate (percent) are reported as ineffective
pub const LOW_HIT_RATE_PERCENT: f64 = 50.0;

/// Serialized size is multiplied by this to approximate in-memory overhead
pub const MEMORY_OVERHEAD_FACTOR: usize = 2;

/// Snapshot of one pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    /// Percentage of lookups served from the pool
    pub hit_rate: f64,
    /// Approximate bytes held, serialized size times overhead
    pub estimated_memory: usize,
}

impl PoolStats {
    fn from_pool(pool: &CachePool) -> Self {
        let stats = pool.stats();
        Self {
            size: pool.len(),
            capacity: pool.capacity(),
            hits: stats.hits(),
            misses: stats.misses(),
            evictions: stats.evictions(),
            expirations: stats.expirations(),
            invalidations: stats.invalidations(),
            hit_rate: stats.hit_rate(),
            estimated_memory: pool.memory_used() * MEMORY_OVERHEAD_FACTOR,
        }
    }

    /// Hit rate with two decimals, e.g. `66.67%`
    pub fn hit_rate_display(&self) -> String {
        format!("{:.2}%", self.hit_rate)
    }

    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn is_full(&self) -> bool {
        self.size >= self.capacity
    }
}

/// Statistics for every configured pool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheReport {
    pub pools: BTreeMap<CacheCategory, PoolStats>,
}

impl CacheReport {
    pub fn pool(&self, category: CacheCategory) -> Option<&PoolStats> {
        self.pools.get(&category)
    }

    pub fn total_entries(&self) -> usize {
        self.pools.values().map(|p| p.size).sum()
    }

    pub fn total_estimated_memory(&self) -> usize {
        self.pools.values().map(|p| p.estimated_memory).sum()
    }

    /// Pretty JSON rendering for diagnostics endpoints
    pub fn to_json(&self) -> query_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl QueryCacheManager {
    /// Snapshot of all pools, computed on demand
    pub fn stats(&self) -> CacheReport {
        let pools = self
            .categories()
            .into_iter()
            .filter_map(|category| {
                self.pool(category)
                    .map(|pool| (category, PoolStats::from_pool(&pool)))
            })
            .collect();
        CacheReport { pools }
    }

    /// Advisory tuning suggestions; pool settings are never changed.
    ///
    /// Expired entries are purged first, so a pool holding only dead entries
    /// is not reported as full.
    pub fn analyze_performance(&self) -> Vec<String> {
        self.purge_expired();
        let mut suggestions = Vec::new();

        for (category, stats) in &self.stats().pools {
            if stats.total_requests() > 0 && stats.hit_rate < LOW_HIT_RATE_PERCENT {
                suggestions.push(format!(
                    "Pool '{}' has a low hit rate ({}); consider a longer TTL or a larger capacity",
                    category,
                    stats.hit_rate_display()
                ));
            }
            if stats.is_full() {
                suggestions.push(format!(
                    "Pool '{}' is at full capacity ({}/{}); consider increasing its size",
                    category, stats.size, stats.capacity
                ));
            }
        }

        suggestions
    }

    /// Log one line per pool
    pub fn log_report(&self) {
        for (category, stats) in &self.stats().pools {
            info!(
                "cache pool {}: {}/{} entries, {} hits, {} misses, hit rate {}, ~{} bytes",
                category,
                stats.size,
                stats.capacity,
                stats.hits,
                stats.misses,
                stats.hit_rate_display(),
                stats.estimated_memory
            );
        }
    }
}
