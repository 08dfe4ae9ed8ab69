use serde::Serialize;
use wit_types::ContentHash;

use crate::canon::{canonical_bytes, CanonError};

/// Domain-separated content hasher.
///
/// Each hasher carries a domain tag (e.g. `"wit-blob-v1"`) that is prepended
/// to every hash computation. This prevents cross-type collisions: a blob
/// and a commit with identical bytes produce different hashes.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for raw file content.
    pub const BLOB: Self = Self {
        domain: "wit-blob-v1",
    };
    /// Hasher for root hashes over file-set tuple lists.
    pub const ROOT: Self = Self {
        domain: "wit-root-v1",
    };
    /// Hasher for commit objects.
    pub const COMMIT: Self = Self {
        domain: "wit-commit-v1",
    };
    /// Hasher for manifest objects.
    pub const MANIFEST: Self = Self {
        domain: "wit-manifest-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        ContentHash::from_digest(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value through the canonical JSON form.
    pub fn hash_canonical<T: Serialize>(&self, value: &T) -> Result<ContentHash, CanonError> {
        Ok(self.hash(&canonical_bytes(value)?))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}
