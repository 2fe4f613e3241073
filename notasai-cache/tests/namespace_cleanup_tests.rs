//! Per-user namespacing, the cold-start sweep and the unavailable store.

use std::sync::Arc;

use notasai_cache::{CleanupReport, KeyValueStore, MemoryStore, TemplateCacheService, UnavailableStore};
use notasai_core::{CacheConfig, Template};
use notasai_test_utils::fixtures::{clock, numbered_template, numbered_templates, service_over};
use notasai_test_utils::TEST_USER;

// ============================================================================
// NAMESPACING
// ============================================================================

#[test]
fn test_users_do_not_share_entries() {
    let store = Arc::new(MemoryStore::new());
    let clock = clock();
    let mut cache = service_over(store.clone(), clock, CacheConfig::default());

    cache.set_templates(&numbered_templates(2));
    assert!(cache.get_templates().is_some());

    cache.set_user("user-2");
    assert_eq!(cache.storage_key(), "notasai_template_cache_user-2");
    assert!(cache.get_templates().is_none());
    cache.add_template(&numbered_template(9));

    cache.set_user(TEST_USER);
    let ids: Vec<String> = cache
        .get_templates()
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec!["t-1", "t-0"]);

    assert!(store.get("notasai_template_cache_user-1").unwrap().is_some());
    assert!(store.get("notasai_template_cache_user-2").unwrap().is_some());
}

#[test]
fn test_clear_only_touches_current_user() {
    let store = Arc::new(MemoryStore::new());
    let mut cache = service_over(store.clone(), clock(), CacheConfig::default());
    cache.set_templates(&numbered_templates(1));
    cache.set_user("user-2");
    cache.set_templates(&numbered_templates(1));

    cache.clear();

    assert!(store.get("notasai_template_cache_user-2").unwrap().is_none());
    assert!(store.get("notasai_template_usage_user-2").unwrap().is_none());
    assert!(store.get("notasai_template_cache_user-1").unwrap().is_some());
    assert!(store.get("notasai_template_usage_user-1").unwrap().is_some());
}

#[test]
fn test_unscoped_keys_before_sign_in() {
    let store = Arc::new(MemoryStore::new());
    let mut cache: TemplateCacheService<MemoryStore> = TemplateCacheService::new(store.clone());
    assert_eq!(cache.storage_key(), "notasai_template_cache");
    assert_eq!(cache.user_id(), None);

    cache.set_templates(&numbered_templates(1));
    assert!(store.get("notasai_template_cache").unwrap().is_some());

    cache.set_user("abc");
    cache.clear_user();
    assert_eq!(cache.storage_key(), "notasai_template_cache");
    assert_eq!(cache.usage_key(), "notasai_template_usage");
}

#[test]
fn test_custom_base_keys() {
    let store = Arc::new(MemoryStore::new());
    let config = CacheConfig::default()
        .with_storage_key("tpl")
        .with_usage_key("tpl_usage_stats");
    let mut cache = service_over(store, clock(), config);
    cache.set_user("u9");

    assert_eq!(cache.storage_key(), "tpl_u9");
    assert_eq!(cache.usage_key(), "tpl_usage_stats_u9");
}

// ============================================================================
// COLD-START SWEEP
// ============================================================================

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            "notasai_template_cache_old",
            r#"{"version":1,"data":{},"lastUpdated":0}"#,
        )
        .unwrap();
    store
        .set(
            "notasai_template_cache_current",
            r#"{"version":2,"data":{},"lastUpdated":0}"#,
        )
        .unwrap();
    store.set("notasai_template_cache_broken", "{{{").unwrap();
    store.set("notasai_template_usage_current", "[]").unwrap();
    store.set("notasai_theme", "dark").unwrap();
    store
}

#[test]
fn test_sweep_runs_at_construction() {
    let store = seeded_store();
    let cache = service_over(store.clone(), clock(), CacheConfig::default());

    assert_eq!(
        cache.cleanup_report(),
        Some(CleanupReport {
            scanned: 4,
            removed_outdated: 2,
            removed_corrupt: 1,
        })
    );
    assert!(store.get("notasai_template_cache_old").unwrap().is_none());
    assert!(store.get("notasai_template_cache_broken").unwrap().is_none());
    assert!(store.get("notasai_template_usage_current").unwrap().is_none());
    assert!(store.get("notasai_template_cache_current").unwrap().is_some());
    assert_eq!(store.get("notasai_theme").unwrap().as_deref(), Some("dark"));
}

#[test]
fn test_sweep_can_run_again() {
    let store = seeded_store();
    let cache = service_over(store.clone(), clock(), CacheConfig::default());
    store.set("notasai_template_cache_late", "oops").unwrap();

    let report = cache.sweep_stale_namespaces();
    assert_eq!(report.removed_corrupt, 1);
    assert_eq!(report.removed_outdated, 0);
}

#[test]
fn test_version_bump_invalidates_every_user() {
    let store = Arc::new(MemoryStore::new());
    let mut cache = service_over(store.clone(), clock(), CacheConfig::default());
    cache.set_templates(&numbered_templates(2));
    cache.set_user("user-2");
    cache.set_templates(&numbered_templates(2));

    let bumped = service_over(store.clone(), clock(), CacheConfig::default().with_version(3));

    let report = bumped.cleanup_report().unwrap();
    assert_eq!(report.removed_outdated, 4);
    assert!(store.is_empty());
    assert!(bumped.get_templates().is_none());
}

#[test]
fn test_newer_version_survives_sweep_but_not_reads() {
    let store = Arc::new(MemoryStore::new());
    let newer = service_over(store.clone(), clock(), CacheConfig::default().with_version(5));
    newer.set_templates(&numbered_templates(1));

    let current = service_over(store.clone(), clock(), CacheConfig::default());
    // Only the usage snapshot goes; it has no version field.
    assert_eq!(current.cleanup_report().map(|r| r.removed()), Some(1));
    assert!(store.get(current.usage_key()).unwrap().is_none());
    assert!(store.get(current.storage_key()).unwrap().is_some());

    assert!(current.get_templates().is_none());
    assert!(store.get(current.storage_key()).unwrap().is_none());
}

// ============================================================================
// UNAVAILABLE STORE
// ============================================================================

#[test]
fn test_unavailable_store_is_inert() {
    let mut cache: TemplateCacheService<UnavailableStore> =
        TemplateCacheService::new(Arc::new(UnavailableStore));
    cache.set_user(TEST_USER);

    cache.set_templates(&numbered_templates(3));
    cache.add_template(&numbered_template(4));
    cache.update_template(&numbered_template(4));
    cache.remove_template("t-4");
    cache.record_template_access("t-0");
    cache.reset_access_counters();
    cache.invalidate();
    cache.clear();

    assert!(!cache.is_available());
    assert!(cache.get_templates().is_none());
    assert!(!cache.is_cache_valid());
    assert!(cache.get_most_used_templates(5).is_empty());
    assert_eq!(cache.get_cache_stats().total_templates, 0);
    assert_eq!(cache.sweep_stale_namespaces(), CleanupReport::default());
}

#[test]
fn test_shared_dyn_store() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let mut cache: TemplateCacheService<dyn KeyValueStore, Template> =
        TemplateCacheService::new(store.clone());
    cache.set_user(TEST_USER);
    cache.set_templates(&numbered_templates(2));

    assert_eq!(cache.get_templates().map(|t| t.len()), Some(2));
    assert!(store.get("notasai_template_cache_user-1").unwrap().is_some());
}
