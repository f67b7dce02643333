//! Isaac Search
//!
//! Per-version search indices for resolved content.
//!
//! # Overview
//!
//! - [`SearchBackend`]: async contract shared by every backend
//! - [`MemorySearchBackend`]: inverted index held in memory, fuzzy and term queries
//! - [`IndexDocument`] / [`SearchHit`]: what goes in and what comes out
//!
//! With the `mock` feature a mockall `MockSearchBackend` is exported for
//! interaction tests.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod backend;
mod document;
mod error;
mod memory;

/// Tokenization helpers
pub mod tokenizer;

#[cfg(any(test, feature = "mock"))]
pub use backend::MockSearchBackend;
pub use backend::SearchBackend;
pub use document::{IndexDocument, SearchHit};
pub use error::SearchError;
pub use memory::MemorySearchBackend;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{IndexDocument, MemorySearchBackend, SearchBackend, SearchError, SearchHit};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
