use wit_types::{ContentHash, RemoteId};

use crate::error::StoreResult;
use crate::object::{RemoteKind, StoredObject};

/// Content-addressed object store.
///
/// Invariants for all implementations:
/// - Objects are immutable once written; the same data always produces the
///   same id, so writes are idempotent.
/// - Concurrent reads are always safe.
/// - The store never interprets object contents.
/// - I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed id.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    fn read(&self, id: &ContentHash) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed id.
    ///
    /// A no-op if the object already exists.
    fn write(&self, object: &StoredObject) -> StoreResult<ContentHash>;

    /// Check whether an object exists.
    fn exists(&self, id: &ContentHash) -> StoreResult<bool>;
}

/// Cache of objects downloaded from remote storage, keyed by the opaque id
/// the storage network assigned.
///
/// Remote objects are immutable once minted, so the cache never needs
/// invalidation; a hit is always current.
pub trait RemoteCache: Send + Sync {
    fn get(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<Option<Vec<u8>>>;

    fn put(&self, kind: RemoteKind, id: &RemoteId, bytes: &[u8]) -> StoreResult<()>;

    fn contains(&self, kind: RemoteKind, id: &RemoteId) -> StoreResult<bool>;
}
