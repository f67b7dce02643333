//! Search backend outages, restarts and cache clearing

use isaac_core::prelude::*;
use isaac_search::{MockSearchBackend, SearchError};
use isaac_test_utils::{abc123_store, version, CountingSearchBackend, CountingVersionStore};
use mockall::predicate::eq;
use std::sync::Arc;

#[tokio::test]
async fn outage_serves_ids_then_recovers_without_rebuild() {
    let store = Arc::new(CountingVersionStore::new(abc123_store()));
    let backend = Arc::new(CountingSearchBackend::new());
    let manager = ContentManager::new(store.clone(), backend.clone());
    let v = version("abc123");

    backend.set_available(false);
    assert!(!manager.ensure_cache(&v).await);
    assert_eq!(manager.version_state(&v).await, VersionState::CacheOnly);
    assert!(manager.get_by_id("p1", &v).await.unwrap().is_some());
    assert!(manager
        .find_by_tags(&v, &["physics".to_string()], 0, None)
        .await
        .unwrap()
        .is_empty());

    backend.set_available(true);
    assert!(manager.ensure_cache(&v).await);
    assert_eq!(store.walk_count(), 1);
    assert_eq!(backend.ready_count(), 1);
}

#[tokio::test]
async fn restarted_backend_is_reindexed_from_cache() {
    let store = Arc::new(CountingVersionStore::new(abc123_store()));
    let backend = Arc::new(CountingSearchBackend::new());
    let manager = ContentManager::new(store.clone(), backend.clone());
    let v = version("abc123");

    assert!(manager.ensure_cache(&v).await);
    backend.restart().await;
    assert_eq!(manager.version_state(&v).await, VersionState::CacheOnly);

    assert!(manager.ensure_cache(&v).await);
    assert_eq!(store.walk_count(), 1);
    assert_eq!(backend.ready_count(), 2);
    assert_eq!(
        manager
            .search_for_content(&v, "p2", 0, None)
            .await
            .unwrap()
            .total_results,
        1
    );
}

#[tokio::test]
async fn clear_cache_forces_full_rebuild() {
    let store = Arc::new(CountingVersionStore::new(abc123_store()));
    let backend = Arc::new(CountingSearchBackend::new());
    let manager = ContentManager::new(store.clone(), backend.clone());
    let v = version("abc123");

    assert!(manager.ensure_cache(&v).await);
    manager.clear_cache().await.unwrap();
    assert_eq!(manager.version_state(&v).await, VersionState::Absent);

    assert!(manager.ensure_cache(&v).await);
    assert_eq!(store.walk_count(), 2);
    assert_eq!(backend.ready_count(), 2);
}

#[tokio::test]
async fn ready_index_elsewhere_is_not_rebuilt() {
    // another server already indexed this version in the shared backend
    let mut backend = MockSearchBackend::new();
    backend
        .expect_has_index()
        .with(eq(version("abc123")))
        .returning(|_| Ok(true));
    backend.expect_index_document().never();
    backend.expect_mark_ready().never();

    let manager = ContentManager::new(abc123_store(), Arc::new(backend));
    let v = version("abc123");
    assert!(manager.ensure_cache(&v).await);
    assert!(manager.ensure_cache(&v).await);
    assert!(manager.validate(&v).await);
}

#[tokio::test]
async fn search_failure_after_ready_degrades_to_empty() {
    let mut backend = MockSearchBackend::new();
    backend.expect_has_index().returning(|_| Ok(true));
    backend
        .expect_fuzzy_search()
        .times(1)
        .returning(|_, _, _, _| Err(SearchError::Unavailable("connection reset".to_string())));
    backend
        .expect_term_search()
        .times(1)
        .returning(|_, _, _, _| Err(SearchError::InvalidQuery("bad field".to_string())));

    let manager = ContentManager::new(abc123_store(), Arc::new(backend));
    let v = version("abc123");

    let found = manager.search_for_content(&v, "page", 0, None).await.unwrap();
    assert!(found.is_empty());
    assert!(matches!(
        manager.find_by_tags(&v, &["x".to_string()], 0, None).await,
        Err(ContentError::Search(SearchError::InvalidQuery(_)))
    ));
}
