//! The root hash: the integrity anchor of one file-set snapshot.

use serde::Serialize;
use wit_hash::ContentHasher;
use wit_types::{ContentHash, FileMetadata, PermissionClass, RootHash};

use crate::error::{IndexError, IndexResult};
use crate::index::Index;

/// One tuple of the path-sorted list the root hash covers.
///
/// Note that `mod_time` is included here even though diffing excludes it;
/// the hash format is an external contract and preserves the field.
/// The encryption envelope is not part of the tuple: encrypting a file does
/// not change the snapshot it belongs to.
#[derive(Serialize)]
struct RootTuple<'a> {
    path: &'a str,
    content_hash: &'a ContentHash,
    size: u64,
    permission_class: PermissionClass,
    mod_time: u64,
}

/// Root hash over any path-sorted file set.
///
/// Recomputable: any holder of the same file set derives the same value,
/// which is what links a commit, its manifest, and the uploaded batch.
pub fn root_hash_of<'a, I>(entries: I) -> IndexResult<RootHash>
where
    I: IntoIterator<Item = (&'a String, &'a FileMetadata)>,
{
    let tuples: Vec<RootTuple<'_>> = entries
        .into_iter()
        .map(|(path, meta)| RootTuple {
            path,
            content_hash: &meta.content_hash,
            size: meta.size,
            permission_class: meta.permission_class,
            mod_time: meta.mod_time,
        })
        .collect();
    let hash = ContentHasher::ROOT
        .hash_canonical(&tuples)
        .map_err(|e| IndexError::Serialization(e.to_string()))?;
    Ok(RootHash::new(hash))
}

/// Root hash of an index.
pub fn root_hash(index: &Index) -> IndexResult<RootHash> {
    root_hash_of(index.iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::compute_meta;
    use wit_types::{EncryptionEnvelope, PermissionClass};

    fn index_of(files: &[(&str, &[u8], u64)]) -> Index {
        let mut idx = Index::new();
        for (path, content, mtime) in files {
            idx.insert(*path, compute_meta(content, PermissionClass::Regular, *mtime))
                .unwrap();
        }
        idx
    }

    #[test]
    fn root_hash_is_reproducible() {
        let idx = index_of(&[("a", b"1", 10), ("b", b"2", 20)]);
        assert_eq!(root_hash(&idx).unwrap(), root_hash(&idx).unwrap());
    }

    #[test]
    fn root_hash_is_insertion_order_independent() {
        let forward = index_of(&[("a", b"1", 10), ("b", b"2", 20)]);
        let reverse = index_of(&[("b", b"2", 20), ("a", b"1", 10)]);
        assert_eq!(root_hash(&forward).unwrap(), root_hash(&reverse).unwrap());
    }

    #[test]
    fn root_hash_tracks_content() {
        let a = index_of(&[("f", b"one", 1)]);
        let b = index_of(&[("f", b"two", 1)]);
        assert_ne!(root_hash(&a).unwrap(), root_hash(&b).unwrap());
    }

    #[test]
    fn root_hash_includes_mod_time() {
        // A touch changes the root hash even though diff ignores it.
        let a = index_of(&[("f", b"same", 100)]);
        let b = index_of(&[("f", b"same", 200)]);
        assert_ne!(root_hash(&a).unwrap(), root_hash(&b).unwrap());
    }

    #[test]
    fn root_hash_includes_permission_class() {
        let mut a = Index::new();
        a.insert("f", compute_meta(b"x", PermissionClass::Regular, 1))
            .unwrap();
        let mut b = Index::new();
        b.insert("f", compute_meta(b"x", PermissionClass::Executable, 1))
            .unwrap();
        assert_ne!(root_hash(&a).unwrap(), root_hash(&b).unwrap());
    }

    #[test]
    fn root_hash_ignores_encryption_envelope() {
        let bare = index_of(&[("f", b"secret", 5)]);

        let mut enc = Index::new();
        let mut meta = compute_meta(b"secret", PermissionClass::Regular, 5);
        meta.encryption = Some(EncryptionEnvelope {
            sealed_key: vec![1, 2],
            nonce: vec![0; 24],
            auth_tag: vec![0; 16],
            policy_id: "p".into(),
        });
        enc.insert("f", meta).unwrap();

        assert_eq!(root_hash(&bare).unwrap(), root_hash(&enc).unwrap());
    }

    #[test]
    fn empty_set_has_a_stable_hash() {
        let empty = Index::new();
        assert_eq!(root_hash(&empty).unwrap(), root_hash(&empty).unwrap());
    }
}
