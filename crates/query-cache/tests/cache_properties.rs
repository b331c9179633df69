use query_cache::{keys, CacheConfig, InvalidationContext, ManualClock, PoolConfig, QueryCacheManager};
use query_core::{CacheCategory, EntityType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn manager_with_clock(config: CacheConfig) -> (Arc<QueryCacheManager>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(QueryCacheManager::with_clock(config, clock.clone()));
    (cache, clock)
}

fn single_pool(category: CacheCategory, capacity: usize, ttl_ms: u64) -> CacheConfig {
    CacheConfig::empty().with_pool(
        category,
        PoolConfig::new(capacity, Duration::from_millis(ttl_ms)),
    )
}

#[tokio::test]
async fn test_cache_aside_runs_producer_once() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    let calls = &AtomicUsize::new(0);

    let fetch = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(vec!["Unit 101".to_string(), "Unit 102".to_string()])
    };

    let key = keys::building_residences("b1");
    let first = cache.with_cache(CacheCategory::Residences, &key, fetch).await;
    let second = cache.with_cache(CacheCategory::Residences, &key, fetch).await;

    assert_eq!(first, second);
    assert_eq!(first.unwrap().len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_ttl_expiry_boundary() {
    let (cache, clock) = manager_with_clock(single_pool(CacheCategory::Users, 10, 1000));
    cache.set(CacheCategory::Users, "user:1", "Ada".to_string());

    clock.advance(Duration::from_millis(999));
    assert!(cache.contains(CacheCategory::Users, "user:1"));

    clock.advance(Duration::from_millis(1));
    assert_eq!(cache.get::<String>(CacheCategory::Users, "user:1"), None);

    let users = cache.stats().pools[&CacheCategory::Users].clone();
    assert_eq!(users.expirations, 1);
    assert_eq!(users.misses, 1);
}

#[test]
fn test_lru_eviction_without_reads() {
    let (cache, _) = manager_with_clock(single_pool(CacheCategory::Buildings, 3, 60_000));
    for i in 0..4 {
        cache.set(CacheCategory::Buildings, keys::building(&i.to_string()), i);
    }

    assert!(!cache.contains(CacheCategory::Buildings, "building:0"));
    for i in 1..4 {
        assert!(cache.contains(CacheCategory::Buildings, &keys::building(&i.to_string())));
    }
}

#[test]
fn test_read_protects_from_eviction() {
    let (cache, _) = manager_with_clock(single_pool(CacheCategory::Buildings, 3, 60_000));
    for i in 0..3 {
        cache.set(CacheCategory::Buildings, keys::building(&i.to_string()), i);
    }

    assert_eq!(cache.get::<i32>(CacheCategory::Buildings, "building:0"), Some(0));
    cache.set(CacheCategory::Buildings, "building:3", 3);

    assert!(cache.contains(CacheCategory::Buildings, "building:0"));
    assert!(!cache.contains(CacheCategory::Buildings, "building:1"));
}

#[test]
fn test_pattern_invalidation_is_exact() {
    let (cache, _) = manager_with_clock(single_pool(CacheCategory::Residences, 100, 60_000));
    let stored = [
        "residence:42",
        "residence:420",
        "residence:42:documents",
        "residence:43",
        "residence:4",
        "old_residence:42",
    ];
    for key in stored {
        cache.set(CacheCategory::Residences, key, key.to_string());
    }

    let removed = cache.invalidate(CacheCategory::Residences, Some("residence:42*"));

    assert_eq!(removed, 3);
    assert!(cache.contains(CacheCategory::Residences, "residence:43"));
    assert!(cache.contains(CacheCategory::Residences, "residence:4"));
    assert!(cache.contains(CacheCategory::Residences, "old_residence:42"));
    assert!(!cache.contains(CacheCategory::Residences, "residence:420"));
}

#[test]
fn test_building_cascade() {
    let (cache, _) = manager_with_clock(CacheConfig::default());

    cache.set(CacheCategory::Buildings, keys::building("b1"), "Maple Court".to_string());
    cache.set(CacheCategory::Buildings, keys::ALL_BUILDINGS, vec!["b1".to_string()]);
    cache.set(CacheCategory::Residences, keys::building_residences("b1"), vec![101u32, 102]);
    cache.set(
        CacheCategory::Residences,
        keys::scoped_with(keys::BUILDING_RESIDENCES, "b1", &["page", "2"]),
        vec![103u32],
    );
    cache.set(CacheCategory::Residences, keys::building_residences("b10"), vec![901u32]);
    cache.set(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS, vec!["u1".to_string()]);
    cache.set(CacheCategory::Organizations, keys::organization("o1"), "Acme Homes".to_string());

    cache.invalidate_entity_caches(EntityType::Building, "b1", &InvalidationContext::updated());

    assert!(!cache.contains(CacheCategory::Buildings, &keys::building("b1")));
    assert!(!cache.contains(CacheCategory::Buildings, keys::ALL_BUILDINGS));
    assert!(!cache.contains(CacheCategory::Residences, &keys::building_residences("b1")));
    assert!(!cache.contains(CacheCategory::Residences, "building_residences:b1:page:2"));
    assert!(!cache.contains(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS));

    assert!(cache.contains(CacheCategory::Residences, &keys::building_residences("b10")));
    assert!(cache.contains(CacheCategory::Organizations, &keys::organization("o1")));
}

#[test]
fn test_residence_cascade_uses_context() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    cache.set(CacheCategory::Residences, keys::residence("r1"), "101".to_string());
    cache.set(CacheCategory::Residences, keys::building_residences("b1"), vec![1u8]);
    cache.set(CacheCategory::Documents, keys::residence_documents("r1"), vec![1u8]);
    cache.set(CacheCategory::Search, "search:maple", vec![1u8]);

    let context = InvalidationContext::updated().with_building("b1");
    cache.invalidate_entity_caches(EntityType::Residence, "r1", &context);

    assert!(!cache.contains(CacheCategory::Residences, &keys::residence("r1")));
    assert!(!cache.contains(CacheCategory::Residences, &keys::building_residences("b1")));
    assert!(!cache.contains(CacheCategory::Documents, &keys::residence_documents("r1")));
    assert!(cache.contains(CacheCategory::Search, "search:maple"));
}

#[test]
fn test_user_cascade() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    for id in ["u1", "u10"] {
        cache.set(CacheCategory::Users, keys::user(id), id.to_string());
        cache.set(CacheCategory::Residences, keys::user_residences(id), vec![1u8]);
        cache.set(CacheCategory::Documents, keys::scoped(keys::USER_DOCUMENTS, id), vec![1u8]);
        cache.set(CacheCategory::Notifications, keys::scoped(keys::USER_NOTIFICATIONS, id), 3u32);
    }
    cache.set(CacheCategory::Users, keys::ALL_USERS, vec!["u1".to_string()]);
    cache.set(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS, vec!["u1".to_string()]);

    let removed =
        cache.invalidate_entity_caches(EntityType::User, "u1", &InvalidationContext::updated());

    assert_eq!(removed, 6);
    assert!(!cache.contains(CacheCategory::Users, &keys::user("u1")));
    assert!(!cache.contains(CacheCategory::Residences, &keys::user_residences("u1")));
    assert!(!cache.contains(CacheCategory::Documents, "user_documents:u1"));
    assert!(!cache.contains(CacheCategory::Notifications, "user_notifications:u1"));
    assert!(!cache.contains(CacheCategory::Users, keys::ALL_USERS));
    assert!(!cache.contains(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS));

    assert!(cache.contains(CacheCategory::Users, &keys::user("u10")));
    assert!(cache.contains(CacheCategory::Residences, &keys::user_residences("u10")));
    assert!(cache.contains(CacheCategory::Documents, "user_documents:u10"));
    assert!(cache.contains(CacheCategory::Notifications, "user_notifications:u10"));
}

#[test]
fn test_organization_cascade() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    for id in ["o1", "o2"] {
        cache.set(CacheCategory::Organizations, keys::organization(id), id.to_string());
        cache.set(CacheCategory::Buildings, keys::organization_buildings(id), vec![1u8]);
        cache.set(CacheCategory::Statistics, keys::scoped(keys::ORGANIZATION_STATS, id), 7u64);
        cache.set(
            CacheCategory::Invitations,
            keys::scoped(keys::ORGANIZATION_INVITATIONS, id),
            vec![1u8],
        );
    }
    cache.set(CacheCategory::Organizations, keys::ALL_ORGANIZATIONS, vec!["o1".to_string()]);
    cache.set(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS, vec!["u1".to_string()]);

    let removed = cache.invalidate_entity_caches(
        EntityType::Organization,
        "o1",
        &InvalidationContext::updated(),
    );

    assert_eq!(removed, 6);
    assert!(!cache.contains(CacheCategory::Organizations, &keys::organization("o1")));
    assert!(!cache.contains(CacheCategory::Buildings, &keys::organization_buildings("o1")));
    assert!(!cache.contains(CacheCategory::Statistics, "organization_stats:o1"));
    assert!(!cache.contains(CacheCategory::Invitations, "organization_invitations:o1"));
    assert!(!cache.contains(CacheCategory::Organizations, keys::ALL_ORGANIZATIONS));
    assert!(!cache.contains(CacheCategory::Users, keys::ALL_USERS_WITH_ASSIGNMENTS));

    assert!(cache.contains(CacheCategory::Organizations, &keys::organization("o2")));
    assert!(cache.contains(CacheCategory::Buildings, &keys::organization_buildings("o2")));
    assert!(cache.contains(CacheCategory::Statistics, "organization_stats:o2"));
    assert!(cache.contains(CacheCategory::Invitations, "organization_invitations:o2"));
}

#[test]
fn test_document_cascade_uses_context() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    cache.set(CacheCategory::Documents, keys::scoped(keys::DOCUMENT, "d1"), "lease.pdf");
    cache.set(CacheCategory::Documents, keys::scoped(keys::DOCUMENT, "d10"), "deed.pdf");
    cache.set(CacheCategory::Documents, keys::ALL_DOCUMENTS, vec!["d1".to_string()]);
    cache.set(CacheCategory::Documents, keys::residence_documents("r1"), vec![1u8]);
    cache.set(CacheCategory::Documents, keys::residence_documents("r2"), vec![2u8]);
    cache.set(CacheCategory::Documents, keys::scoped(keys::BUILDING_DOCUMENTS, "b1"), vec![1u8]);
    cache.set(CacheCategory::Documents, keys::scoped(keys::USER_DOCUMENTS, "u1"), vec![1u8]);

    let context = InvalidationContext::created()
        .with_residence("r1")
        .with_building("b1")
        .with_user("u1");
    let removed = cache.invalidate_entity_caches(EntityType::Document, "d1", &context);

    assert_eq!(removed, 5);
    assert!(!cache.contains(CacheCategory::Documents, "document:d1"));
    assert!(!cache.contains(CacheCategory::Documents, keys::ALL_DOCUMENTS));
    assert!(!cache.contains(CacheCategory::Documents, &keys::residence_documents("r1")));
    assert!(!cache.contains(CacheCategory::Documents, "building_documents:b1"));
    assert!(!cache.contains(CacheCategory::Documents, "user_documents:u1"));

    assert!(cache.contains(CacheCategory::Documents, "document:d10"));
    assert!(cache.contains(CacheCategory::Documents, &keys::residence_documents("r2")));
}

#[test]
fn test_bill_cascade_uses_context() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    cache.set(CacheCategory::Bills, keys::scoped(keys::BILL, "bl1"), 120u32);
    cache.set(CacheCategory::Bills, keys::scoped(keys::BILL, "bl10"), 80u32);
    cache.set(CacheCategory::Bills, keys::ALL_BILLS, vec!["bl1".to_string()]);
    cache.set(CacheCategory::Bills, keys::scoped(keys::RESIDENCE_BILLS, "r1"), vec![120u32]);
    cache.set(CacheCategory::Bills, keys::scoped(keys::RESIDENCE_BILLS, "r2"), vec![80u32]);
    cache.set(
        CacheCategory::Financial,
        keys::scoped_with(keys::BUILDING_FINANCIAL, "b1", &["2024"]),
        1200u64,
    );
    cache.set(CacheCategory::Financial, keys::scoped(keys::BUILDING_FINANCIAL, "b2"), 900u64);

    let context = InvalidationContext::updated().with_residence("r1").with_building("b1");
    let removed = cache.invalidate_entity_caches(EntityType::Bill, "bl1", &context);

    assert_eq!(removed, 4);
    assert!(!cache.contains(CacheCategory::Bills, "bill:bl1"));
    assert!(!cache.contains(CacheCategory::Bills, keys::ALL_BILLS));
    assert!(!cache.contains(CacheCategory::Bills, "residence_bills:r1"));
    assert!(!cache.contains(CacheCategory::Financial, "building_financial:b1:2024"));

    assert!(cache.contains(CacheCategory::Bills, "bill:bl10"));
    assert!(cache.contains(CacheCategory::Bills, "residence_bills:r2"));
    assert!(cache.contains(CacheCategory::Financial, "building_financial:b2"));
}

#[test]
fn test_invitation_cascade_uses_context() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    cache.set(CacheCategory::Invitations, keys::scoped(keys::INVITATION, "i1"), "pending");
    cache.set(CacheCategory::Invitations, keys::scoped(keys::INVITATION, "i10"), "accepted");
    cache.set(CacheCategory::Invitations, keys::ALL_INVITATIONS, vec!["i1".to_string()]);
    cache.set(
        CacheCategory::Invitations,
        keys::scoped(keys::ORGANIZATION_INVITATIONS, "o1"),
        vec![1u8],
    );
    cache.set(
        CacheCategory::Invitations,
        keys::scoped(keys::ORGANIZATION_INVITATIONS, "o2"),
        vec![2u8],
    );
    cache.set(
        CacheCategory::Invitations,
        keys::scoped(keys::BUILDING_INVITATIONS, "b1"),
        vec![1u8],
    );

    let context = InvalidationContext::deleted()
        .with_organization("o1")
        .with_building("b1");
    let removed = cache.invalidate_entity_caches(EntityType::Invitation, "i1", &context);

    assert_eq!(removed, 4);
    assert!(!cache.contains(CacheCategory::Invitations, "invitation:i1"));
    assert!(!cache.contains(CacheCategory::Invitations, keys::ALL_INVITATIONS));
    assert!(!cache.contains(CacheCategory::Invitations, "organization_invitations:o1"));
    assert!(!cache.contains(CacheCategory::Invitations, "building_invitations:b1"));

    assert!(cache.contains(CacheCategory::Invitations, "invitation:i10"));
    assert!(cache.contains(CacheCategory::Invitations, "organization_invitations:o2"));
}

#[test]
fn test_wildcard_in_entity_id_is_literal() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    let star_page = keys::scoped_with(keys::BUILDING_RESIDENCES, "*", &["page", "2"]);
    let real_page = keys::scoped_with(keys::BUILDING_RESIDENCES, "b1", &["page", "2"]);
    cache.set(CacheCategory::Residences, star_page.clone(), vec![1u8]);
    cache.set(CacheCategory::Residences, real_page.clone(), vec![2u8]);

    cache.invalidate_entity_caches(EntityType::Building, "*", &InvalidationContext::updated());

    assert!(!cache.contains(CacheCategory::Residences, &star_page));
    assert!(cache.contains(CacheCategory::Residences, &real_page));
}

#[test]
fn test_delete_clears_search_pool() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    cache.set(CacheCategory::Users, keys::user("u1"), "Ada".to_string());
    cache.set(CacheCategory::Search, "search:ada", vec!["u1".to_string()]);
    cache.set(CacheCategory::Search, "search:bob", vec!["u2".to_string()]);

    cache.invalidate_entity_caches(EntityType::User, "u1", &InvalidationContext::deleted());

    assert_eq!(cache.len(CacheCategory::Search), 0);
    assert!(!cache.contains(CacheCategory::Users, &keys::user("u1")));
}

#[test]
fn test_hit_miss_accounting() {
    let (cache, _) = manager_with_clock(single_pool(CacheCategory::Users, 10, 60_000));

    for i in 0..3 {
        cache.get::<String>(CacheCategory::Users, &keys::user(&i.to_string()));
    }
    cache.set(CacheCategory::Users, "user:x", "Ada".to_string());
    for _ in 0..5 {
        cache.get::<String>(CacheCategory::Users, "user:x");
    }

    let report = cache.stats();
    let users = report.pool(CacheCategory::Users).unwrap();
    assert_eq!(users.misses, 3);
    assert_eq!(users.hits, 5);
    assert_eq!(users.hit_rate_display(), "62.50%");
}

#[tokio::test]
async fn test_producer_error_propagates_and_is_not_cached() {
    let (cache, _) = manager_with_clock(CacheConfig::default());
    let calls = &AtomicUsize::new(0);

    let failing = move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<String, String>("DB down".to_string())
    };

    let result = cache.with_cache(CacheCategory::Users, "user:1", failing).await;
    assert_eq!(result, Err("DB down".to_string()));

    let users = cache.stats().pools[&CacheCategory::Users].clone();
    assert_eq!(users.misses, 1);
    assert_eq!(users.hits, 0);
    assert_eq!(users.size, 0);

    let retry = cache.with_cache(CacheCategory::Users, "user:1", failing).await;
    assert!(retry.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_capacity_two_scenario() {
    let (cache, _) = manager_with_clock(single_pool(CacheCategory::Buildings, 2, 1000));
    cache.set(CacheCategory::Buildings, "b1", "X".to_string());
    cache.set(CacheCategory::Buildings, "b2", "Y".to_string());
    cache.set(CacheCategory::Buildings, "b3", "Z".to_string());

    assert_eq!(cache.get::<String>(CacheCategory::Buildings, "b1"), None);
    assert_eq!(cache.get::<String>(CacheCategory::Buildings, "b2").as_deref(), Some("Y"));
    assert_eq!(cache.get::<String>(CacheCategory::Buildings, "b3").as_deref(), Some("Z"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_are_not_coalesced() {
    let cache = Arc::new(QueryCacheManager::new(CacheConfig::default()));
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(tokio::sync::Barrier::new(4));

    let tasks = (0..4).map(|_| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        let gate = Arc::clone(&gate);
        tokio::spawn(async move {
            cache
                .with_cache(CacheCategory::Statistics, "building_stats:b1", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.wait().await;
                    Ok::<_, String>(42u64)
                })
                .await
        })
    });

    let results = futures::future::join_all(tasks).await;
    for result in results {
        assert_eq!(result.unwrap(), Ok(42));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(cache.get::<u64>(CacheCategory::Statistics, "building_stats:b1"), Some(42));
}
