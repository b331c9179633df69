//! Query Caching Example
//!
//! Puts the query cache in front of a simulated property database: cache-aside
//! reads, cascade invalidation after writes, and the diagnostics report.
//!
//! # Running the Example
//!
//! ```bash
//! RUST_LOG=query_cache=debug cargo run --example caching_query
//! ```

use anyhow::Result;
use query_cache::{
    keys, CacheConfig, InvalidationContext, LatencyTracker, PoolConfig, QueryCacheManager,
};
use query_cache_examples::{seed, Building, PropertyStore, Residence, StoreError};
use query_core::{CacheCategory, EntityType};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Data-access layer holding the cache by handle
struct BuildingRepository {
    store: Arc<PropertyStore>,
    cache: Arc<QueryCacheManager>,
    tracker: LatencyTracker,
}

impl BuildingRepository {
    async fn building(&self, id: &str) -> std::result::Result<Building, StoreError> {
        self.cache
            .with_optimizations(
                CacheCategory::Buildings,
                &keys::building(id),
                "buildings.by_id",
                &self.tracker,
                || self.store.building(id),
            )
            .await
    }

    async fn residences(&self, building_id: &str) -> std::result::Result<Vec<Residence>, StoreError> {
        self.cache
            .with_cache(
                CacheCategory::Residences,
                &keys::building_residences(building_id),
                || self.store.residences_of(building_id),
            )
            .await
    }

    async fn rename(&self, id: &str, name: &str) -> std::result::Result<(), StoreError> {
        self.store.rename_building(id, name).await?;
        let organization_id = self.store.building(id).await?.organization_id;
        let context = InvalidationContext::updated().with_organization(organization_id);
        self.cache.invalidate_entity_caches(EntityType::Building, id, &context);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Query Caching Example ===\n");

    let config = CacheConfig::default()
        .with_pool(CacheCategory::Buildings, PoolConfig::new(2, Duration::from_secs(60)));
    let cache = Arc::new(QueryCacheManager::new(config));
    let store = Arc::new(PropertyStore::default());
    seed(&store).await;

    let repo = BuildingRepository {
        store: Arc::clone(&store),
        cache: Arc::clone(&cache),
        tracker: LatencyTracker::new(Duration::from_millis(15)),
    };

    println!("--- Cache-aside reads ---");
    for _ in 0..3 {
        let building = repo.building("b1").await?;
        let residences = repo.residences("b1").await?;
        println!("  {} has {} residences", building.name, residences.len());
    }
    println!("  Store queries so far: {}\n", store.query_count());

    println!("--- Errors are not cached ---");
    for _ in 0..2 {
        if let Err(e) = repo.building("b404").await {
            println!("  {}", e);
        }
    }
    println!();

    println!("--- Write then cascade ---");
    repo.rename("b1", "Maple Court East").await?;
    let building = repo.building("b1").await?;
    println!("  After rename: {}", building.name);
    println!(
        "  Residence list cached: {}\n",
        cache.contains(CacheCategory::Residences, &keys::building_residences("b1"))
    );

    println!("--- Statistics ---");
    for (category, stats) in cache.stats().pools.iter().filter(|(_, s)| s.total_requests() > 0) {
        println!(
            "  {:<12} size {}/{} hits {} misses {} hit rate {} ~{} bytes",
            category.as_str(),
            stats.size,
            stats.capacity,
            stats.hits,
            stats.misses,
            stats.hit_rate_display(),
            stats.estimated_memory
        );
    }
    for suggestion in cache.analyze_performance() {
        println!("  suggestion: {}", suggestion);
    }
    for (label, timing) in repo.tracker.report() {
        println!("  {} ran {} times, avg {:?}", label, timing.calls, timing.average());
    }

    println!("\n=== Caching example completed! ===");
    Ok(())
}
