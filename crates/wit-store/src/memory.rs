use std::collections::HashMap;
use std::sync::RwLock;

use wit_types::{ContentHash, RemoteId};

use crate::error::StoreResult;
use crate::object::{RemoteKind, StoredObject};
use crate::traits::{ObjectStore, RemoteCache};

/// In-memory store implementing both [`ObjectStore`] and [`RemoteCache`].
///
/// Intended for tests and embedding. All data is held behind `RwLock`s;
/// objects are cloned on read and write.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ContentHash, StoredObject>>,
    remote: RwLock<HashMap<(RemoteKind, RemoteId), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of content-addressed objects currently stored.
    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Number of cached remote objects.
    pub fn cached_count(&self) -> usize {
        self.remote.read().expect("lock poisoned").len()
    }
}

impl ObjectStore for MemoryStore {
    fn read(&self, id: &ContentHash) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn write(&self, object: &StoredObject) -> StoreResult<ContentHash> {
        let id = object.compute_id();
        let mut map = self.objects.write().expect("lock poisoned");
        // Idempotent: content-addressing guarantees the same id always maps
        // to the same bytes.
        map.entry(id).or_insert_with(|| object.clone());
        Ok(id)
    }

    fn exists(&self, id: &ContentHash) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }
}

impl RemoteCache for MemoryStore {
    fn get(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<Option<Vec<u8>>> {
        let map = self.remote.read().expect("lock poisoned");
        Ok(map.get(&(kind, id.clone())).cloned())
    }

    fn put(&self, kind: RemoteKind, id: &RemoteId, bytes: &[u8]) -> StoreResult<()> {
        let mut map = self.remote.write().expect("lock poisoned");
        map.entry((kind, id.clone())).or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    fn contains(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<bool> {
        let map = self.remote.read().expect("lock poisoned");
        Ok(map.contains_key(&(kind, id.clone())))
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("objects", &self.object_count())
            .field("cached", &self.cached_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn blob(content: &[u8]) -> StoredObject {
        StoredObject::new(ObjectKind::Blob, content.to_vec())
    }

    #[test]
    fn write_and_read() {
        let store = MemoryStore::new();
        let obj = blob(b"hello world");
        let id = store.write(&obj).unwrap();
        let back = store.read(&id).unwrap().expect("should exist");
        assert_eq!(back, obj);
    }

    #[test]
    fn read_missing_returns_none() {
        let store = MemoryStore::new();
        assert!(store.read(&ContentHash::from_bytes(b"missing")).unwrap().is_none());
    }

    #[test]
    fn write_is_idempotent() {
        let store = MemoryStore::new();
        let obj = blob(b"idempotent");
        let id1 = store.write(&obj).unwrap();
        let id2 = store.write(&obj).unwrap();
        assert_eq!(id1, id2);
        assert_eq!(store.object_count(), 1);
    }

    #[test]
    fn exists_tracks_writes() {
        let store = MemoryStore::new();
        let id = store.write(&blob(b"present")).unwrap();
        assert!(store.exists(&id).unwrap());
        assert!(!store.exists(&ContentHash::from_bytes(b"absent")).unwrap());
    }

    #[test]
    fn remote_cache_roundtrip() {
        let store = MemoryStore::new();
        let id = RemoteId::new("remote-1");
        store.put(RemoteKind::Manifest, &id, b"manifest bytes").unwrap();
        assert!(store.contains(RemoteKind::Manifest, &id).unwrap());
        assert_eq!(
            store.get(RemoteKind::Manifest, &id).unwrap().unwrap(),
            b"manifest bytes"
        );
    }

    #[test]
    fn remote_cache_kinds_are_separate_keyspaces() {
        let store = MemoryStore::new();
        let id = RemoteId::new("shared-id");
        store.put(RemoteKind::Commit, &id, b"commit").unwrap();
        assert!(!store.contains(RemoteKind::Manifest, &id).unwrap());
        assert!(store.contains(RemoteKind::Commit, &id).unwrap());
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemoryStore::new());
        let id = store.write(&blob(b"shared")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let obj = store.read(&id).unwrap().unwrap();
                    assert_eq!(obj.compute_id(), id);
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
    }
}
