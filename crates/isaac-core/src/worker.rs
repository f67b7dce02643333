//! Background synchronisation jobs
//!
//! A [`SyncWorker`] prepares one version in its own task and reports the
//! outcome to a [`SyncListener`]. Running it twice for the same version is
//! harmless: the second run finds the cache and the index already built.

use crate::manager::ContentManager;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use isaac_model::{VersionId, VersionSelector};
use std::sync::Arc;
use tokio::task::JoinHandle;
use ulid::Ulid;

/// Receives the result of every sync job
#[async_trait]
pub trait SyncListener: Send + Sync {
    /// Called once per job, after the job finished
    async fn on_sync_complete(&self, outcome: &SyncOutcome);
}

/// Identity of one sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub id: Ulid,
    pub requested_at: DateTime<Utc>,
    pub selector: VersionSelector,
}

impl SyncJob {
    /// Create new job for a selector
    #[must_use]
    pub fn new(selector: VersionSelector) -> Self {
        Self {
            id: Ulid::new(),
            requested_at: Utc::now(),
            selector,
        }
    }
}

/// What a sync job achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub job: SyncJob,
    /// Version the selector resolved to; `None` if it did not resolve
    pub version: Option<VersionId>,
    /// Version reached READY
    pub success: bool,
    pub finished_at: DateTime<Utc>,
}

/// One fire-and-forget sync of a version
pub struct SyncWorker {
    manager: ContentManager,
    listener: Arc<dyn SyncListener>,
    job: SyncJob,
}

impl std::fmt::Debug for SyncWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorker").field("job", &self.job).finish_non_exhaustive()
    }
}

impl SyncWorker {
    /// Create new worker
    #[must_use]
    pub fn new(
        manager: ContentManager,
        listener: Arc<dyn SyncListener>,
        selector: impl Into<VersionSelector>,
    ) -> Self {
        Self {
            manager,
            listener,
            job: SyncJob::new(selector.into()),
        }
    }

    /// Job this worker runs
    #[inline]
    #[must_use]
    pub fn job(&self) -> &SyncJob {
        &self.job
    }

    /// Run on a new tokio task without waiting for it
    pub fn spawn(self) -> JoinHandle<SyncOutcome> {
        tokio::spawn(self.run())
    }

    /// Resolve the selector, prepare the version and notify the listener
    ///
    /// A pinned version the store cannot resolve fails without touching any
    /// cache; `Latest` is resolved now, not when the job was created.
    pub async fn run(self) -> SyncOutcome {
        let job = self.job;
        tracing::info!("Sync job {} started for {}", job.id, job.selector);

        let version = match self.manager.resolve_selector(&job.selector).await {
            Ok(version) => Some(version),
            Err(err) => {
                tracing::error!("Sync job {} cannot resolve {}: {}", job.id, job.selector, err);
                None
            }
        };
        let success = match &version {
            Some(version) => self.manager.ensure_cache(version).await,
            None => false,
        };

        let outcome = SyncOutcome {
            job,
            version,
            success,
            finished_at: Utc::now(),
        };
        if success {
            tracing::info!(
                "Sync job {} finished: {:?} ready",
                outcome.job.id,
                outcome.version.as_ref().map(VersionId::as_str)
            );
        } else {
            tracing::warn!("Sync job {} failed for {}", outcome.job.id, outcome.job.selector);
        }
        self.listener.on_sync_complete(&outcome).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isaac_search::MemorySearchBackend;
    use isaac_store::MemoryVersionStore;
    use parking_lot::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        seen: Mutex<Vec<(Option<VersionId>, bool)>>,
    }

    #[async_trait]
    impl SyncListener for Recorder {
        async fn on_sync_complete(&self, outcome: &SyncOutcome) {
            self.seen.lock().push((outcome.version.clone(), outcome.success));
        }
    }

    fn v(raw: &str) -> VersionId {
        VersionId::new(raw).unwrap()
    }

    fn setup() -> (ContentManager, Arc<Recorder>) {
        let store = Arc::new(MemoryVersionStore::new());
        store
            .commit_as(v("v1"), [("a.json", r#"{"id":"a","type":"page"}"#)])
            .unwrap();
        store
            .commit_as(v("v2"), [("b.json", r#"{"id":"b","type":"page"}"#)])
            .unwrap();
        let manager = ContentManager::new(store, Arc::new(MemorySearchBackend::new()));
        (manager, Arc::new(Recorder::default()))
    }

    #[tokio::test]
    async fn latest_resolves_at_run_time() {
        let (manager, recorder) = setup();
        let outcome = SyncWorker::new(manager.clone(), recorder.clone(), VersionSelector::Latest)
            .spawn()
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.version, Some(v("v2")));
        assert!(outcome.finished_at >= outcome.job.requested_at);
        assert_eq!(recorder.seen.lock().clone(), vec![(Some(v("v2")), true)]);
        assert_eq!(manager.cached_versions(), vec![v("v2")]);
    }

    #[tokio::test]
    async fn unknown_pinned_version_fails_without_building() {
        let (manager, recorder) = setup();
        let outcome = SyncWorker::new(manager.clone(), recorder.clone(), v("ghost"))
            .run()
            .await;
        assert!(!outcome.success);
        assert_eq!(outcome.version, None);
        assert_eq!(recorder.seen.lock().clone(), vec![(None, false)]);
        assert!(manager.cached_versions().is_empty());
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let (manager, recorder) = setup();
        for _ in 0..2 {
            let outcome = SyncWorker::new(manager.clone(), recorder.clone(), v("v1")).run().await;
            assert!(outcome.success);
        }
        assert_eq!(recorder.seen.lock().len(), 2);
        assert_eq!(manager.cached_versions(), vec![v("v1")]);
    }

    #[test]
    fn jobs_get_distinct_ids() {
        let a = SyncJob::new(VersionSelector::Latest);
        let b = SyncJob::new(VersionSelector::Latest);
        assert_ne!(a.id, b.id);
    }
}
