use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wit_hash::canonical_bytes;
use wit_store::{ObjectKind, StoredObject};
use wit_types::{CommitId, FileMetadata, RemoteId, RootHash};

/// An immutable commit.
///
/// `files` is present only for local, not-yet-uploaded commits; the remote
/// record produced at push time replaces it with `{manifest_id, batch_id}`.
/// The local object is never mutated after creation: its id is the content
/// hash of its canonical serialization, so mutation would change identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree_root_hash: RootHash,
    pub manifest_id: Option<RemoteId>,
    pub batch_id: Option<RemoteId>,
    pub files: Option<BTreeMap<String, FileMetadata>>,
    pub parent: Option<CommitId>,
    pub author: String,
    pub message: String,
    pub timestamp_secs: u64,
    pub extras: BTreeMap<String, serde_json::Value>,
}

impl Commit {
    /// Canonical serialization; the byte stream the commit id hashes.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, crate::ChainError> {
        canonical_bytes(self).map_err(|e| crate::ChainError::Serialization(e.to_string()))
    }

    /// The commit's content-derived local identity.
    pub fn compute_id(&self) -> Result<CommitId, crate::ChainError> {
        Ok(CommitId::new(self.to_stored_object()?.compute_id()))
    }

    pub fn to_stored_object(&self) -> Result<StoredObject, crate::ChainError> {
        Ok(StoredObject::new(ObjectKind::Commit, self.canonical_bytes()?))
    }

    pub fn from_stored_object(id: CommitId, obj: &StoredObject) -> Result<Self, crate::ChainError> {
        if obj.kind != ObjectKind::Commit {
            return Err(crate::ChainError::Corrupt {
                id,
                reason: format!("expected commit, got {}", obj.kind),
            });
        }
        serde_json::from_slice(&obj.data).map_err(|e| crate::ChainError::Corrupt {
            id,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wit_types::{ContentHash, PermissionClass};

    fn sample_files() -> BTreeMap<String, FileMetadata> {
        let mut files = BTreeMap::new();
        files.insert(
            "a.txt".to_string(),
            FileMetadata {
                content_hash: ContentHash::from_bytes(b"hello"),
                size: 5,
                permission_class: PermissionClass::Regular,
                mod_time: 1_700_000_000,
                encryption: None,
            },
        );
        files
    }

    fn sample_commit() -> Commit {
        Commit {
            tree_root_hash: RootHash::new(ContentHash::from_bytes(b"root")),
            manifest_id: None,
            batch_id: None,
            files: Some(sample_files()),
            parent: None,
            author: "alice".into(),
            message: "initial".into(),
            timestamp_secs: 1_700_000_000,
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn id_is_deterministic() {
        let c = sample_commit();
        assert_eq!(c.compute_id().unwrap(), c.compute_id().unwrap());
    }

    #[test]
    fn any_field_change_changes_id() {
        let base = sample_commit();
        let base_id = base.compute_id().unwrap();

        let mut changed = base.clone();
        changed.message = "different".into();
        assert_ne!(changed.compute_id().unwrap(), base_id);

        let mut changed = base.clone();
        changed.timestamp_secs += 1;
        assert_ne!(changed.compute_id().unwrap(), base_id);

        let mut changed = base.clone();
        changed.parent = Some(CommitId::new(ContentHash::from_bytes(b"parent")));
        assert_ne!(changed.compute_id().unwrap(), base_id);

        let mut changed = base.clone();
        changed.tree_root_hash = RootHash::new(ContentHash::from_bytes(b"other root"));
        assert_ne!(changed.compute_id().unwrap(), base_id);

        let mut changed = base;
        changed.author = "mallory".into();
        assert_ne!(changed.compute_id().unwrap(), base_id);
    }

    #[test]
    fn stored_object_roundtrip() {
        let c = sample_commit();
        let id = c.compute_id().unwrap();
        let stored = c.to_stored_object().unwrap();
        let back = Commit::from_stored_object(id, &stored).unwrap();
        assert_eq!(c, back);
    }

    #[test]
    fn wrong_kind_is_corrupt() {
        let c = sample_commit();
        let id = c.compute_id().unwrap();
        let stored = StoredObject::new(ObjectKind::Blob, c.canonical_bytes().unwrap());
        let err = Commit::from_stored_object(id, &stored).unwrap_err();
        assert!(matches!(err, crate::ChainError::Corrupt { .. }));
    }

    #[test]
    fn undecodable_bytes_are_corrupt() {
        let id = CommitId::new(ContentHash::from_bytes(b"x"));
        let stored = StoredObject::new(ObjectKind::Commit, b"not json".to_vec());
        let err = Commit::from_stored_object(id, &stored).unwrap_err();
        assert!(matches!(err, crate::ChainError::Corrupt { .. }));
    }

    #[test]
    fn canonical_bytes_are_key_sorted() {
        let bytes = sample_commit().canonical_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.find("\"author\"").unwrap() < text.find("\"batch_id\"").unwrap());
        assert!(text.find("\"batch_id\"").unwrap() < text.find("\"files\"").unwrap());
    }
}
