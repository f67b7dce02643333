//! Isaac Version Store
//!
//! Read-only access to immutable, versioned content trees.
//!
//! # Overview
//!
//! - [`VersionStore`]: the async contract the content manager consumes
//! - [`MemoryVersionStore`]: content-addressed in-memory store; commit ids are Merkle roots
//! - [`DirectoryVersionStore`]: one snapshot directory per version
//!
//! # Example
//!
//! ```rust
//! use isaac_store::{MemoryVersionStore, VersionStore};
//!
//! # tokio_test_block(async {
//! let store = MemoryVersionStore::new();
//! let version = store.commit([("page1.json", r#"{"id":"p1","type":"page"}"#)]).unwrap();
//! let tree = store.resolve(&version).await.unwrap().unwrap();
//! assert_eq!(store.walk(&tree, ".json").await.unwrap().len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod directory;
mod error;
mod memory;
mod store;

pub use directory::DirectoryVersionStore;
pub use error::StoreError;
pub use memory::MemoryVersionStore;
pub use store::{TreeEntry, TreeHandle, VersionStore};

/// Prelude for common imports
pub mod prelude {
    pub use crate::{MemoryVersionStore, StoreError, TreeEntry, TreeHandle, VersionStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
