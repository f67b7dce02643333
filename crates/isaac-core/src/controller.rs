//! Live version pointer
//!
//! [`ContentVersionController`] decides which version readers should use.
//! It only moves forward: a successful sync flips the pointer when the new
//! version is at least as recent as the current one.

use crate::manager::ContentManager;
use crate::worker::{SyncListener, SyncOutcome, SyncWorker};
use async_trait::async_trait;
use isaac_model::{VersionId, VersionSelector};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Owns the live version and the sync jobs that move it
#[derive(Debug)]
pub struct ContentVersionController {
    manager: ContentManager,
    live: watch::Sender<Option<VersionId>>,
    flip: Mutex<()>,
}

impl ContentVersionController {
    /// Create new controller with no live version
    #[must_use]
    pub fn new(manager: ContentManager) -> Arc<Self> {
        let (live, _) = watch::channel(None);
        Arc::new(Self {
            manager,
            live,
            flip: Mutex::new(()),
        })
    }

    /// Manager syncs run against
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ContentManager {
        &self.manager
    }

    /// Version readers should use
    #[must_use]
    pub fn live_version(&self) -> Option<VersionId> {
        self.live.borrow().clone()
    }

    /// Receiver notified whenever the live version changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<VersionId>> {
        self.live.subscribe()
    }

    /// Start a background sync; the live version moves when it succeeds
    pub fn trigger_sync(self: &Arc<Self>, selector: impl Into<VersionSelector>) -> JoinHandle<SyncOutcome> {
        let listener: Arc<dyn SyncListener> = Arc::clone(self) as Arc<dyn SyncListener>;
        SyncWorker::new(self.manager.clone(), listener, selector).spawn()
    }

    async fn should_replace(&self, current: Option<&VersionId>, candidate: &VersionId) -> bool {
        let Some(current) = current else {
            return true;
        };
        if current == candidate {
            return false;
        }
        match self.manager.compare_versions(candidate, current).await {
            Ok(order) => order.is_ge(),
            Err(err) => {
                tracing::warn!(
                    "Cannot order {} against live version {}: {}",
                    candidate.short(),
                    current.short(),
                    err
                );
                false
            }
        }
    }
}

#[async_trait]
impl SyncListener for ContentVersionController {
    async fn on_sync_complete(&self, outcome: &SyncOutcome) {
        let Some(candidate) = outcome.version.as_ref().filter(|_| outcome.success) else {
            tracing::warn!(
                "Sync job {} for {} failed; live version unchanged",
                outcome.job.id,
                outcome.job.selector
            );
            return;
        };

        let _guard = self.flip.lock().await;
        let current = self.live_version();
        if !self.should_replace(current.as_ref(), candidate).await {
            tracing::debug!("Live version stays at {:?}", current.as_ref().map(VersionId::short));
            return;
        }

        self.live.send_replace(Some(candidate.clone()));
        tracing::info!(
            "Live content version is now {} (was {:?})",
            candidate,
            current.as_ref().map(VersionId::as_str)
        );
        if let Some(previous) = current {
            if self.manager.config().evict_superseded_versions {
                self.manager.evict_version(&previous).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentConfig;
    use isaac_search::MemorySearchBackend;
    use isaac_store::MemoryVersionStore;

    fn v(raw: &str) -> VersionId {
        VersionId::new(raw).unwrap()
    }

    fn controller(evict: bool) -> (Arc<ContentVersionController>, Arc<MemoryVersionStore>) {
        let store = Arc::new(MemoryVersionStore::new());
        store
            .commit_as(v("v1"), [("a.json", r#"{"id":"a","type":"page"}"#)])
            .unwrap();
        store
            .commit_as(v("v2"), [("a.json", r#"{"id":"a","type":"page","title":"v2"}"#)])
            .unwrap();
        let config = ContentConfig::default().with_evict_superseded_versions(evict);
        let manager =
            ContentManager::with_config(store.clone(), Arc::new(MemorySearchBackend::new()), config)
                .unwrap();
        (ContentVersionController::new(manager), store)
    }

    #[tokio::test]
    async fn successful_sync_flips_and_notifies() {
        let (controller, _) = controller(false);
        let mut updates = controller.subscribe();
        assert_eq!(controller.live_version(), None);

        let outcome = controller.trigger_sync(v("v1")).await.unwrap();
        assert!(outcome.success);
        assert_eq!(controller.live_version(), Some(v("v1")));
        assert!(updates.has_changed().unwrap());
        assert_eq!(*updates.borrow_and_update(), Some(v("v1")));

        controller.trigger_sync(VersionSelector::Latest).await.unwrap();
        assert_eq!(controller.live_version(), Some(v("v2")));
        assert_eq!(controller.manager().cached_versions(), vec![v("v1"), v("v2")]);
    }

    #[tokio::test]
    async fn never_moves_backwards() {
        let (controller, _) = controller(false);
        controller.trigger_sync(v("v2")).await.unwrap();
        let outcome = controller.trigger_sync(v("v1")).await.unwrap();
        assert!(outcome.success);
        assert_eq!(controller.live_version(), Some(v("v2")));
    }

    #[tokio::test]
    async fn failures_leave_pointer_alone() {
        let (controller, _) = controller(false);
        controller.trigger_sync(v("v1")).await.unwrap();
        let outcome = controller.trigger_sync(v("ghost")).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(controller.live_version(), Some(v("v1")));
    }

    #[tokio::test]
    async fn evicts_superseded_versions_when_configured() {
        let (controller, _) = controller(true);
        controller.trigger_sync(v("v1")).await.unwrap();
        controller.trigger_sync(v("v2")).await.unwrap();
        assert_eq!(controller.live_version(), Some(v("v2")));
        assert_eq!(controller.manager().cached_versions(), vec![v("v2")]);
        // the search index of the old version is kept
        assert!(controller
            .manager()
            .backend()
            .has_index(&v("v1"))
            .await
            .unwrap());
    }
}
