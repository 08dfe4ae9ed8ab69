//! Filesystem-backed store.
//!
//! Layout under the store root:
//!
//! ```text
//! objects/blobs/<hex>      content-addressed file bytes
//! objects/commits/<hex>    content-addressed commit objects
//! remote/commits/<hex>     cached remote commit records
//! remote/manifests/<hex>   cached manifests
//! remote/blobs/<hex>       cached downloaded file bytes
//! tmp/                     staging area for atomic writes
//! ```
//!
//! Writes land in `tmp/` first and are renamed into place, so a crashed
//! write never leaves a truncated object visible. File names are hex so the
//! layout is portable across filesystems.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;
use wit_types::{ContentHash, RemoteId};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, RemoteKind, StoredObject};
use crate::traits::{ObjectStore, RemoteCache};

pub struct FsStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        for dir in [
            "objects/blobs",
            "objects/commits",
            "remote/commits",
            "remote/manifests",
            "remote/blobs",
            "tmp",
        ] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, kind: ObjectKind, id: &ContentHash) -> PathBuf {
        let dir = match kind {
            ObjectKind::Blob => "blobs",
            ObjectKind::Commit => "commits",
        };
        self.root
            .join("objects")
            .join(dir)
            .join(hex::encode(id.as_bytes()))
    }

    fn remote_path(&self, kind: RemoteKind, id: &RemoteId) -> PathBuf {
        self.root
            .join("remote")
            .join(kind.dir_name())
            .join(hex::encode(id.as_str().as_bytes()))
    }

    /// Write bytes to a temp file, then rename into place.
    fn write_atomic(&self, target: &Path, bytes: &[u8]) -> StoreResult<()> {
        if target.exists() {
            return Ok(()); // immutable content; nothing to do
        }
        let tmp_name = format!(
            "{}-{}",
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        );
        let tmp_path = self.root.join("tmp").join(tmp_name);
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, target)?;
        Ok(())
    }
}

impl ObjectStore for FsStore {
    fn read(&self, id: &ContentHash) -> StoreResult<Option<StoredObject>> {
        // Kind is encoded by directory; probe both.
        for kind in [ObjectKind::Blob, ObjectKind::Commit] {
            let path = self.object_path(kind, id);
            if !path.exists() {
                continue;
            }
            let data = fs::read(&path)?;
            let object = StoredObject::new(kind, data);
            let actual = object.compute_id();
            if actual != *id {
                return Err(StoreError::HashMismatch {
                    expected: id.to_text(),
                    actual: actual.to_text(),
                });
            }
            return Ok(Some(object));
        }
        Ok(None)
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ContentHash> {
        let id = object.compute_id();
        let path = self.object_path(object.kind, &id);
        self.write_atomic(&path, &object.data)?;
        debug!(kind = %object.kind, id = %id.short(), size = object.size(), "stored object");
        Ok(id)
    }

    fn exists(&self, id: &ContentHash) -> StoreResult<bool> {
        Ok([ObjectKind::Blob, ObjectKind::Commit]
            .iter()
            .any(|kind| self.object_path(*kind, id).exists()))
    }
}

impl RemoteCache for FsStore {
    fn get(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<Option<Vec<u8>>> {
        let path = self.remote_path(kind, id);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn put(&self, kind: RemoteKind, id: &RemoteId, bytes: &[u8]) -> StoreResult<()> {
        let path = self.remote_path(kind, id);
        self.write_atomic(&path, bytes)
    }

    fn contains(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<bool> {
        Ok(self.remote_path(kind, id).exists())
    }
}

impl std::fmt::Debug for FsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStore").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, FsStore) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::open(dir.path().join("store")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_layout() {
        let (_dir, store) = open_store();
        assert!(store.root().join("objects/blobs").is_dir());
        assert!(store.root().join("remote/manifests").is_dir());
        assert!(store.root().join("tmp").is_dir());
    }

    #[test]
    fn object_roundtrip() {
        let (_dir, store) = open_store();
        let obj = StoredObject::new(ObjectKind::Blob, b"persisted".to_vec());
        let id = store.write(&obj).unwrap();
        let back = store.read(&id).unwrap().expect("should exist");
        assert_eq!(back, obj);
    }

    #[test]
    fn object_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let id = {
            let store = FsStore::open(dir.path().join("store")).unwrap();
            store
                .write(&StoredObject::new(ObjectKind::Commit, b"commit data".to_vec()))
                .unwrap()
        };
        let store = FsStore::open(dir.path().join("store")).unwrap();
        let back = store.read(&id).unwrap().expect("should persist");
        assert_eq!(back.kind, ObjectKind::Commit);
        assert_eq!(back.data, b"commit data");
    }

    #[test]
    fn corrupted_object_is_detected() {
        let (_dir, store) = open_store();
        let obj = StoredObject::new(ObjectKind::Blob, b"original".to_vec());
        let id = store.write(&obj).unwrap();

        // Tamper with the stored file behind the store's back.
        let path = store.object_path(ObjectKind::Blob, &id);
        fs::write(&path, b"tampered").unwrap();

        let err = store.read(&id).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
    }

    #[test]
    fn remote_cache_roundtrip() {
        let (_dir, store) = open_store();
        let id = RemoteId::new("batch/with/slashes");
        store.put(RemoteKind::Blob, &id, b"remote bytes").unwrap();
        assert!(store.contains(RemoteKind::Blob, &id).unwrap());
        assert_eq!(
            store.get(RemoteKind::Blob, &id).unwrap().unwrap(),
            b"remote bytes"
        );
    }

    #[test]
    fn remote_cache_miss() {
        let (_dir, store) = open_store();
        let id = RemoteId::new("never-seen");
        assert!(store.get(RemoteKind::Commit, &id).unwrap().is_none());
        assert!(!store.contains(RemoteKind::Commit, &id).unwrap());
    }

    #[test]
    fn tmp_dir_left_clean_after_writes() {
        let (_dir, store) = open_store();
        store
            .write(&StoredObject::new(ObjectKind::Blob, b"a".to_vec()))
            .unwrap();
        store.put(RemoteKind::Blob, &RemoteId::new("r"), b"b").unwrap();
        let leftover = fs::read_dir(store.root().join("tmp")).unwrap().count();
        assert_eq!(leftover, 0);
    }
}
