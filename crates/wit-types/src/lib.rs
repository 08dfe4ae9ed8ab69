//! Foundation types for wit.
//!
//! Everything that more than one layer needs to name lives here: the
//! content-hash identifier family, the storage-assigned remote identifiers,
//! and the per-file metadata that indexes, commits, and manifests share.

pub mod error;
pub mod hash;
pub mod meta;

pub use error::TypeError;
pub use hash::{CommitId, ContentHash, RootHash, HASH_ALGO};
pub use meta::{base64_bytes, EncryptionEnvelope, FileMetadata, PermissionClass, RemoteId, RepoId};
