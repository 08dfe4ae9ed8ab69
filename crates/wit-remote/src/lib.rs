//! External collaborator interfaces.
//!
//! The remote side of wit is three services behind traits: the ledger
//! (authoritative head pointer with an optimistic-concurrency version),
//! content storage (blobs and batches), and the policy service (key
//! sealing). The wire types a remote commit consists of (the commit
//! record and the manifest) live here too, along with the in-memory fakes
//! the test suites run against.

pub mod alias;
pub mod decode;
pub mod dir;
pub mod error;
pub mod memory;
pub mod retry;
pub mod traits;
pub mod types;

pub use alias::storage_id;
pub use decode::decode_text;
pub use dir::DirRemote;
pub use error::{RemoteError, RemoteResult};
pub use memory::{InMemoryContentStore, InMemoryLedger, StaticPolicyClient, ValueEncoding};
pub use retry::{with_retry, RetryPolicy};
pub use traits::{ContentClient, LedgerClient, PolicyClient};
pub use types::{
    BatchFile, BatchReceipt, Manifest, ManifestEntry, PolicyProof, RemoteCommitRecord,
    RepositoryState,
};
