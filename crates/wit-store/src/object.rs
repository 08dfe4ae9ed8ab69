use serde::{Deserialize, Serialize};
use wit_hash::ContentHasher;
use wit_types::ContentHash;

/// The kind of a locally stored, content-addressed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// Raw file content.
    Blob,
    /// Canonically serialized commit.
    Commit,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blob => write!(f, "blob"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// The kind of a cached remote object, keyed by its storage-assigned id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteKind {
    /// A remote commit record.
    Commit,
    /// A manifest.
    Manifest,
    /// File bytes downloaded from content storage.
    Blob,
}

impl RemoteKind {
    /// Directory name under the cache root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Commit => "commits",
            Self::Manifest => "manifests",
            Self::Blob => "blobs",
        }
    }
}

/// A stored object: kind tag plus serialized bytes.
///
/// The store never interprets the data; it is a pure key-value store keyed
/// by the content hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Content-addressed id, using the domain hasher for the object's kind.
    pub fn compute_id(&self) -> ContentHash {
        let hasher = match self.kind {
            ObjectKind::Blob => &ContentHasher::BLOB,
            ObjectKind::Commit => &ContentHasher::COMMIT,
        };
        hasher.hash(&self.data)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_id_is_deterministic() {
        let obj = StoredObject::new(ObjectKind::Blob, b"deterministic".to_vec());
        assert_eq!(obj.compute_id(), obj.compute_id());
    }

    #[test]
    fn kinds_are_domain_separated() {
        let data = b"same data".to_vec();
        let blob = StoredObject::new(ObjectKind::Blob, data.clone());
        let commit = StoredObject::new(ObjectKind::Commit, data);
        assert_ne!(blob.compute_id(), commit.compute_id());
    }

    #[test]
    fn remote_kind_dirs_are_distinct() {
        let dirs = [
            RemoteKind::Commit.dir_name(),
            RemoteKind::Manifest.dir_name(),
            RemoteKind::Blob.dir_name(),
        ];
        assert_eq!(
            dirs.iter().collect::<std::collections::HashSet<_>>().len(),
            3
        );
    }
}
