//! In-process query cache for the property-management data layer
//!
//! One bounded LRU pool per data category (users, buildings, residences, ...),
//! each with its own capacity and TTL, plus the pieces data-access code needs
//! around it.
//!
//! # Features
//!
//! - **LRU Eviction**: Least recently used entries are evicted when a pool is full
//! - **TTL Support**: Entries older than the pool's TTL are treated as absent
//! - **Cache-aside**: `with_cache` runs the query only on a miss
//! - **Cascade Invalidation**: a write to a building also clears its residence
//!   lists and the user-assignment aggregate
//! - **Statistics**: Per-pool hits, misses, evictions and memory estimates
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{keys, CacheConfig, InvalidationContext, QueryCacheManager};
//! use query_core::{CacheCategory, EntityType};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(QueryCacheManager::new(CacheConfig::default()));
//!
//! // Reads go through the cache
//! let building = cache
//!     .with_cache(CacheCategory::Buildings, &keys::building(id), || db.fetch_building(id))
//!     .await?;
//!
//! // Writes invalidate afterwards
//! db.update_building(id, changes).await?;
//! cache.invalidate_entity_caches(EntityType::Building, id, &InvalidationContext::updated());
//! ```

pub mod cache;
pub mod cached;
pub mod clock;
pub mod config;
pub mod invalidation;
pub mod keys;
pub mod manager;
pub mod monitor;
pub mod pattern;
pub mod stats;
pub mod tracker;

pub use cache::{CacheEntry, CachePool};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, PoolConfig};
pub use invalidation::{
    rules_for, CacheInvalidator, InvalidationContext, InvalidationEvent, InvalidationRule,
    RuleTarget,
};
pub use manager::QueryCacheManager;
pub use monitor::{CacheReport, PoolStats};
pub use pattern::KeyPattern;
pub use stats::CacheStats;
pub use tracker::{LatencyTracker, QueryTiming, QueryTracker};
