//! Bounded, TTL-expiring LRU pool for one cache category

use crate::clock::Clock;
use crate::config::PoolConfig;
use crate::pattern::KeyPattern;
use crate::stats::CacheStats;
use lru::LruCache;
use parking_lot::RwLock;
use query_core::CacheCategory;
use serde::Serialize;
use std::any::Any;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Entry stored in a pool
#[derive(Clone)]
pub struct CacheEntry {
    /// Cached value, type-erased
    value: Arc<dyn Any + Send + Sync>,
    /// Name of the stored type, for diagnostics
    type_name: &'static str,
    /// Age origin: insertion time, or last read when reads refresh
    pub refreshed_at: Instant,
    /// Serialized size of the value in bytes
    pub size_bytes: usize,
    /// Number of times this entry was read
    pub hit_count: u64,
}

impl CacheEntry {
    /// Create a new cache entry
    pub fn new<T>(value: T, now: Instant) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        let size_bytes = estimate_value_size(&value);
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            refreshed_at: now,
            size_bytes,
            hit_count: 0,
        }
    }

    /// An entry is expired once its age reaches the TTL
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.refreshed_at) >= ttl
    }

    /// Get the age of this entry
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.refreshed_at)
    }

    /// Borrow the value if it was stored as a `T`
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Name of the stored type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("refreshed_at", &self.refreshed_at)
            .field("size_bytes", &self.size_bytes)
            .field("hit_count", &self.hit_count)
            .finish()
    }
}

/// Serialized JSON length of a value, 0 if it cannot be serialized
fn estimate_value_size<T: Serialize>(value: &T) -> usize {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes.len(),
        Err(e) => {
            debug!("Could not size cached value: {}", e);
            0
        }
    }
}

/// Result of a single pool lookup
enum Lookup<T> {
    Hit(T),
    Miss,
    Expired,
    TypeMismatch(&'static str),
}

/// Everything guarded by the pool lock
struct PoolState {
    entries: LruCache<String, CacheEntry>,
    config: PoolConfig,
    memory_used: usize,
}

impl PoolState {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.memory_used = self.memory_used.saturating_sub(entry.size_bytes);
                true
            }
            None => false,
        }
    }
}

/// Zero-capacity pools are raised to hold a single entry
fn normalized(category: CacheCategory, mut config: PoolConfig) -> PoolConfig {
    if config.capacity == 0 {
        warn!("Cache pool '{}' configured with zero capacity; using 1", category);
        config.capacity = 1;
    }
    config
}

fn capacity_of(config: &PoolConfig) -> NonZeroUsize {
    NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Thread-safe LRU pool with TTL expiration
pub struct CachePool {
    category: CacheCategory,
    state: RwLock<PoolState>,
    stats: Arc<CacheStats>,
    clock: Arc<dyn Clock>,
}

impl CachePool {
    /// Create a new pool with the given configuration
    pub fn new(category: CacheCategory, config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        let config = normalized(category, config);
        Self {
            category,
            state: RwLock::new(PoolState {
                entries: LruCache::new(capacity_of(&config)),
                config,
                memory_used: 0,
            }),
            stats: Arc::new(CacheStats::new()),
            clock,
        }
    }

    /// Category this pool serves
    pub fn category(&self) -> CacheCategory {
        self.category
    }

    /// Read a value, recording a hit or a miss
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        let now = self.clock.now();
        let mut state = self.state.write();
        let ttl = state.config.ttl();
        let refresh = state.config.refresh_on_get;

        let outcome = match state.entries.peek(key) {
            None => Lookup::Miss,
            Some(entry) if entry.is_expired(now, ttl) => Lookup::Expired,
            Some(entry) => match entry.downcast_ref::<T>() {
                Some(value) => Lookup::Hit(value.clone()),
                None => Lookup::TypeMismatch(entry.type_name),
            },
        };

        match outcome {
            Lookup::Hit(value) => {
                if let Some(entry) = state.entries.get_mut(key) {
                    entry.hit_count += 1;
                    if refresh {
                        entry.refreshed_at = now;
                    }
                }
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Miss => {
                self.stats.record_miss();
                None
            }
            Lookup::Expired => {
                state.remove(key);
                self.stats.record_expirations(1);
                self.stats.record_miss();
                None
            }
            Lookup::TypeMismatch(stored) => {
                warn!(
                    "Cache pool '{}' key '{}' holds {} but {} was requested",
                    self.category,
                    key,
                    stored,
                    std::any::type_name::<T>()
                );
                self.stats.record_miss();
                None
            }
        }
    }

    /// Insert or overwrite an entry, evicting the LRU entry when full
    pub fn insert<T>(&self, key: impl Into<String>, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        let key = key.into();
        let entry = CacheEntry::new(value, self.clock.now());
        let entry_size = entry.size_bytes;

        let mut state = self.state.write();
        state.remove(&key);

        if let Some((evicted_key, evicted)) = state.entries.push(key, entry) {
            state.memory_used = state.memory_used.saturating_sub(evicted.size_bytes);
            self.stats.record_eviction();
            debug!("Evicted '{}' from cache pool '{}'", evicted_key, self.category);
        }

        state.memory_used += entry_size;
    }

    /// Whether a live entry exists, without touching recency or counters
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        let state = self.state.read();
        let ttl = state.config.ttl();
        state
            .entries
            .peek(key)
            .map(|entry| !entry.is_expired(now, ttl))
            .unwrap_or(false)
    }

    /// Remove a single entry
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.state.write().remove(key);
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    /// Remove every entry whose key matches the pattern
    pub fn remove_matching(&self, pattern: &KeyPattern) -> usize {
        if pattern.is_exact() {
            return usize::from(self.remove(pattern.as_str()));
        }

        let mut state = self.state.write();
        let matching: Vec<String> = state
            .entries
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            state.remove(key);
        }
        drop(state);

        self.stats.record_invalidations(matching.len() as u64);
        matching.len()
    }

    /// Remove all entries, returning how many there were
    pub fn clear(&self) -> usize {
        let removed = {
            let mut state = self.state.write();
            let count = state.entries.len();
            state.entries.clear();
            state.memory_used = 0;
            count
        };
        self.stats.record_invalidations(removed as u64);
        removed
    }

    /// Expire entries that have exceeded TTL
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write();
        let ttl = state.config.ttl();

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.remove(key);
        }
        drop(state);

        self.stats.record_expirations(expired.len() as u64);
        expired.len()
    }

    /// Apply a new capacity/TTL, evicting LRU entries if the pool shrinks
    pub fn reconfigure(&self, config: PoolConfig) {
        let config = normalized(self.category, config);
        let capacity = capacity_of(&config);
        let mut state = self.state.write();

        while state.entries.len() > capacity.get() {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.memory_used = state.memory_used.saturating_sub(evicted.size_bytes);
                    self.stats.record_eviction();
                }
                None => break,
            }
        }

        state.entries.resize(capacity);
        state.config = config;
    }

    /// Keys currently stored, most recently used first
    pub fn keys(&self) -> Vec<String> {
        self.state
            .read()
            .entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Get current number of entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if the pool is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Configured maximum number of entries
    pub fn capacity(&self) -> usize {
        self.state.read().entries.cap().get()
    }

    /// Sum of serialized value sizes in bytes
    pub fn memory_used(&self) -> usize {
        self.state.read().memory_used
    }

    /// Current pool configuration
    pub fn config(&self) -> PoolConfig {
        self.state.read().config.clone()
    }

    /// Get pool statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

impl std::fmt::Debug for CachePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("CachePool")
            .field("category", &self.category)
            .field("capacity", &state.config.capacity)
            .field("ttl_ms", &state.config.ttl_ms)
            .field("current_entries", &state.entries.len())
            .field("memory_used", &state.memory_used)
            .finish()
    }
}
