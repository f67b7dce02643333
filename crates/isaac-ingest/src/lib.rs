//! Isaac Content Ingest
//!
//! Parse, resolve and cache one version of the content repository.
//!
//! # Core Concepts
//!
//! - [`TypeRegistry`]: type tag → [`BodyDecoder`]
//! - [`ContentMapper`]: polymorphic JSON ↔ [`ContentNode`](isaac_model::ContentNode)
//! - [`VersionCacheBuilder`]: walk, parse, flatten and de-duplicate a version
//! - [`VersionCache`]: immutable id → node map for one version
//! - [`VersionCacheStore`]: process-wide, single-flight map of built versions

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod builder;
mod cache;
mod error;
mod mapper;
mod registry;

pub use builder::{VersionCacheBuilder, DEFAULT_CONTENT_SUFFIX};
pub use cache::{BuildReport, DuplicateConflict, VersionCache, VersionCacheStore};
pub use error::{BuildError, ParseError, RegistryError};
pub use mapper::{resolve_against, ContentMapper, DecodeContext};
pub use registry::{
    BodyDecoder, ChoiceDecoder, FigureDecoder, GenericDecoder, QuantityDecoder, QuestionDecoder,
    TypeRegistry,
};

/// Default number of versions kept in memory
pub const DEFAULT_MAX_VERSIONS: u64 = 16;

/// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BuildError, ContentMapper, ParseError, TypeRegistry, VersionCache, VersionCacheBuilder,
        VersionCacheStore,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
