//! Local object storage.
//!
//! Two stores with different key spaces live side by side: the
//! content-addressed [`ObjectStore`] for objects whose identity is their
//! hash (blobs, local commits), and the [`RemoteCache`] for objects fetched
//! from remote storage, keyed by the opaque id the storage network assigned.

pub mod error;
pub mod fs;
pub mod memory;
pub mod object;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use object::{ObjectKind, RemoteKind, StoredObject};
pub use traits::{ObjectStore, RemoteCache};
