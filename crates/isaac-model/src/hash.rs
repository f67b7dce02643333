//! Content-addressed hashing primitives
//!
//! Provides [`ContentHash`], the 32-byte Blake3 digest used to address raw
//! blobs in a version store and to fingerprint parsed content nodes.

use std::fmt::{self, Display, Formatter};

/// A 32-byte content hash (Blake3)
///
/// Blobs in a version tree are stored under their hash, and content nodes
/// are fingerprinted with it so duplicate ids can be compared without a
/// deep structural walk. Immutable and `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a hash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hash arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Hash the canonical JSON encoding of a value
    ///
    /// `serde_json::Value` objects keep their keys sorted, so two values that
    /// compare equal always produce the same fingerprint.
    #[must_use]
    pub fn of_json(value: &serde_json::Value) -> Self {
        Self::compute(value.to_string().as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compute_is_deterministic() {
        assert_eq!(ContentHash::compute(b"page"), ContentHash::compute(b"page"));
        assert_ne!(ContentHash::compute(b"page"), ContentHash::compute(b"figure"));
    }

    #[test]
    fn display_is_full_hex() {
        let hash = ContentHash::compute(b"diagram.png");
        assert_eq!(hash.to_string().len(), 64);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn json_fingerprint_ignores_key_order() {
        let a = json!({"id": "p1", "type": "page", "title": "Forces"});
        let b: serde_json::Value =
            serde_json::from_str(r#"{"title": "Forces", "type": "page", "id": "p1"}"#).unwrap();
        assert_eq!(ContentHash::of_json(&a), ContentHash::of_json(&b));
        assert_ne!(
            ContentHash::of_json(&a),
            ContentHash::of_json(&json!({"id": "p1", "type": "page"}))
        );
        assert_eq!(
            ContentHash::of_json(&a),
            ContentHash::compute(br#"{"id":"p1","title":"Forces","type":"page"}"#)
        );
    }
}
