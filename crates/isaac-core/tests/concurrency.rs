//! Single-flight builds, index passes and caller deadlines

use isaac_core::prelude::*;
use isaac_test_utils::{abc123_store, version, CountingSearchBackend, CountingVersionStore};
use std::sync::Arc;
use std::time::Duration;

fn counted(delay: Option<Duration>) -> (ContentManager, Arc<CountingVersionStore>, Arc<CountingSearchBackend>) {
    let mut store = CountingVersionStore::new(abc123_store());
    if let Some(delay) = delay {
        store = store.with_walk_delay(delay);
    }
    let store = Arc::new(store);
    let backend = Arc::new(CountingSearchBackend::new());
    let manager = ContentManager::new(store.clone(), backend.clone());
    (manager, store, backend)
}

#[tokio::test]
async fn sequential_calls_walk_once() {
    let (manager, store, backend) = counted(None);
    let v = version("abc123");

    assert!(manager.ensure_cache(&v).await);
    assert!(manager.ensure_cache(&v).await);
    assert!(manager.get_by_id("p2", &v).await.unwrap().is_some());

    assert_eq!(store.walk_count(), 1);
    assert_eq!(backend.ready_count(), 1);
    assert_eq!(backend.document_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_share_one_build() {
    let (manager, store, backend) = counted(Some(Duration::from_millis(50)));
    let v = version("abc123");

    let callers: Vec<_> = (0..16)
        .map(|_| {
            let manager = manager.clone();
            let v = v.clone();
            tokio::spawn(async move { manager.ensure_cache(&v).await })
        })
        .collect();
    for caller in callers {
        assert!(caller.await.unwrap());
    }

    assert_eq!(store.walk_count(), 1);
    assert_eq!(backend.ready_count(), 1);
    assert_eq!(backend.document_count(), 2);
    assert_eq!(manager.version_state(&v).await, VersionState::Ready);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn versions_build_independently() {
    let store = isaac_store::MemoryVersionStore::new();
    for id in ["a", "b", "c"] {
        store
            .commit_as(version(id), [(format!("{id}.json"), isaac_test_utils::page_json(id, &[]))])
            .unwrap();
    }
    let store = Arc::new(CountingVersionStore::new(Arc::new(store)).with_walk_delay(Duration::from_millis(20)));
    let manager = ContentManager::new(store.clone(), Arc::new(CountingSearchBackend::new()));

    let tasks: Vec<_> = ["a", "b", "c", "a", "b", "c"]
        .into_iter()
        .map(|id| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_cache(&version(id)).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }
    assert_eq!(store.walk_count(), 3);
    assert_eq!(manager.cached_versions(), vec![version("a"), version("b"), version("c")]);
}

#[tokio::test(start_paused = true)]
async fn deadline_reports_false_but_build_completes() {
    let store = Arc::new(
        CountingVersionStore::new(abc123_store()).with_walk_delay(Duration::from_secs(5)),
    );
    let config = ContentConfig::default().with_ensure_cache_timeout(Duration::from_millis(100));
    let manager =
        ContentManager::with_config(store.clone(), Arc::new(CountingSearchBackend::new()), config)
            .unwrap();
    let v = version("abc123");

    assert!(matches!(
        manager.try_ensure_cache(&v).await,
        Err(ContentError::Timeout { duration_ms: 100 })
    ));
    assert!(!manager.ensure_cache(&v).await);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(manager.ensure_cache(&v).await);
    assert_eq!(store.walk_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn reads_of_built_version_do_not_wait_for_another_build() {
    let store = isaac_store::MemoryVersionStore::new();
    for id in ["a", "b"] {
        store
            .commit_as(version(id), [(format!("{id}.json"), isaac_test_utils::page_json(id, &[]))])
            .unwrap();
    }
    let delay = Duration::from_secs(30);
    let store = Arc::new(CountingVersionStore::new(Arc::new(store)).with_walk_delay(delay));
    let manager = ContentManager::new(store.clone(), Arc::new(CountingSearchBackend::new()));
    let (a, b) = (version("a"), version("b"));

    assert!(manager.ensure_cache(&b).await);

    let slow = {
        let manager = manager.clone();
        let a = a.clone();
        tokio::spawn(async move { manager.ensure_cache(&a).await })
    };
    while store.walk_count() < 2 {
        tokio::task::yield_now().await;
    }

    let started = tokio::time::Instant::now();
    assert!(manager.get_by_id("b", &b).await.unwrap().is_some());
    assert_eq!(
        manager.search_for_content(&b, "page", 0, None).await.unwrap().total_results,
        1
    );
    assert!(started.elapsed() < delay);
    assert!(!slow.is_finished());
    assert_eq!(manager.version_state(&a).await, VersionState::Absent);

    assert!(slow.await.unwrap());
    assert_eq!(manager.version_state(&a).await, VersionState::Ready);
    assert_eq!(store.walk_count(), 2);
}
