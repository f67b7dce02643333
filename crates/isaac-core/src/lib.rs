//! Isaac Content Manager
//!
//! Version-pinned access to the Isaac content repository.
//!
//! # Architecture
//!
//! ```text
//! SyncWorker ──▶ ContentManager::ensure_cache ──▶ VersionCacheBuilder (walk + parse)
//!     │                     │                 ──▶ IntegrityValidator
//!     ▼                     │                 ──▶ SearchSynchronizer ──▶ SearchBackend
//! ContentVersionController  ▼
//!   (live version)     reads: get_by_id, find_by_type, find_by_tags, search_for_content
//! ```
//!
//! # Example
//!
//! ```rust
//! use isaac_core::prelude::*;
//! use isaac_search::MemorySearchBackend;
//! use isaac_store::MemoryVersionStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ContentError> {
//! let store = Arc::new(MemoryVersionStore::new());
//! let version = store.commit([("page.json", r#"{"id":"p1","type":"page"}"#)])?;
//! let manager = ContentManager::new(store, Arc::new(MemorySearchBackend::new()));
//!
//! assert!(manager.ensure_cache(&version).await);
//! assert!(manager.get_by_id("p1", &version).await?.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod controller;
mod error;
mod manager;
mod synchronizer;
mod types;
mod validator;
mod worker;

pub use config::{ContentConfig, DEFAULT_SEARCH_FIELDS};
pub use controller::ContentVersionController;
pub use error::ContentError;
pub use manager::ContentManager;
pub use synchronizer::{IndexOutcome, SearchSynchronizer, CONTENT_DOC_TYPE};
pub use types::{ProblemMap, ResultsWrapper, VersionState};
pub use validator::{IntegrityReport, IntegrityValidator};
pub use worker::{SyncJob, SyncListener, SyncOutcome, SyncWorker};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        ContentConfig, ContentError, ContentManager, ContentVersionController, ResultsWrapper,
        SyncListener, SyncOutcome, SyncWorker, VersionState,
    };
    pub use isaac_model::{ContentNode, VersionId, VersionSelector};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
