//! Isaac Content Model
//!
//! Shared types for version-pinned content: identifiers, tree paths, blob
//! hashes and the polymorphic content node.
//!
//! # Core Concepts
//!
//! - [`VersionId`]: Opaque id of an immutable content snapshot
//! - [`VersionSelector`]: "latest" or a pinned version
//! - [`TreePath`]: Normalized location of a file inside a version tree
//! - [`ContentHash`]: 32-byte Blake3 hash for content addressing
//! - [`ContentNode`]: One unit of content with typed [`ContentBody`]
//! - [`TreeDigest`]: Merkle root over a version tree

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod content;
mod hash;
mod merkle;
mod path;
mod version;

pub use content::{ChoiceBody, ContentBody, ContentNode, FigureBody, QuantityBody, QuestionBody};
pub use hash::ContentHash;
pub use merkle::TreeDigest;
pub use path::{is_external_reference, PathError, TreePath};
pub use version::{VersionError, VersionId, VersionSelector};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
pub mod prelude {
    pub use crate::{ContentBody, ContentHash, ContentNode, TreePath, VersionId, VersionSelector};
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn figure_paths_and_hashes_line_up() {
        let source = TreePath::parse("physics/page.json").unwrap();
        let asset = source.resolve_sibling("figures/a.png").unwrap();
        let figure = ContentNode::new("figure").with_body(ContentBody::Figure(FigureBody {
            src: Some(asset.to_string()),
            alt_text: None,
            ..FigureBody::default()
        }));
        assert_eq!(figure.asset_src(), Some("physics/figures/a.png"));

        let blob = ContentHash::compute(b"png bytes");
        let root = TreeDigest::from_entries([(&asset, &blob)]).root();
        assert_eq!(VersionId::from_root(&root).as_str(), root.to_string());
    }
}
