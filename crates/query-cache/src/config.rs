//! Cache configuration options

use query_core::{CacheCategory, CacheError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

fn default_true() -> bool {
    true
}

/// Configuration for a single cache pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of entries in the pool
    pub capacity: usize,
    /// Time-to-live for entries, in milliseconds
    pub ttl_ms: u64,
    /// Whether a successful read resets the entry's age
    #[serde(default = "default_true")]
    pub refresh_on_get: bool,
}

impl PoolConfig {
    /// Create a pool configuration with the given capacity and TTL
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl_ms: ttl.as_millis() as u64,
            refresh_on_get: true,
        }
    }

    /// Entry lifetime as a `Duration`
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Set the maximum number of entries
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the TTL duration
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }

    /// Keep the original insertion time as the age origin on reads
    pub fn with_refresh_on_get(mut self, refresh: bool) -> Self {
        self.refresh_on_get = refresh;
        self
    }
}

/// Configuration for the whole query cache: one entry per pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pool table, category -> capacity/TTL
    #[serde(default)]
    pub pools: BTreeMap<CacheCategory, PoolConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let minutes = |m: u64| Duration::from_secs(m * 60);
        Self::empty()
            .with_pool(CacheCategory::Users, PoolConfig::new(1000, minutes(5)))
            .with_pool(CacheCategory::Buildings, PoolConfig::new(500, minutes(10)))
            .with_pool(CacheCategory::Residences, PoolConfig::new(2000, minutes(10)))
            .with_pool(CacheCategory::Documents, PoolConfig::new(3000, minutes(5)))
            .with_pool(CacheCategory::Bills, PoolConfig::new(2000, minutes(5)))
            .with_pool(CacheCategory::Maintenance, PoolConfig::new(1000, minutes(3)))
            .with_pool(CacheCategory::Notifications, PoolConfig::new(2000, minutes(1)))
            .with_pool(CacheCategory::Organizations, PoolConfig::new(100, minutes(30)))
            .with_pool(CacheCategory::Invitations, PoolConfig::new(500, minutes(5)))
            .with_pool(CacheCategory::Financial, PoolConfig::new(500, minutes(15)))
            .with_pool(CacheCategory::Statistics, PoolConfig::new(200, minutes(5)))
            .with_pool(CacheCategory::Search, PoolConfig::new(500, minutes(2)))
    }
}

impl CacheConfig {
    /// Create an enabled configuration with no pools
    pub fn empty() -> Self {
        Self {
            enabled: true,
            pools: BTreeMap::new(),
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Add or replace the configuration of one pool
    pub fn with_pool(mut self, category: CacheCategory, pool: PoolConfig) -> Self {
        self.pools.insert(category, pool);
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Look up the configuration of one pool
    pub fn pool(&self, category: CacheCategory) -> Option<&PoolConfig> {
        self.pools.get(&category)
    }

    /// Parse a configuration table from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration table from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Write the configuration table as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject pools that could never hold an entry
    pub fn validate(&self) -> Result<()> {
        for (category, pool) in &self.pools {
            if pool.capacity == 0 {
                return Err(CacheError::ConfigError(format!(
                    "pool '{}' has zero capacity",
                    category
                )));
            }
            if pool.ttl_ms == 0 {
                return Err(CacheError::ConfigError(format!(
                    "pool '{}' has zero ttl",
                    category
                )));
            }
        }
        Ok(())
    }
}
