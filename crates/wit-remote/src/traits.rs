use async_trait::async_trait;
use wit_types::{RemoteId, RepoId};

use crate::error::RemoteResult;
use crate::types::{BatchFile, BatchReceipt, PolicyProof, RepositoryState};

/// The remote ledger: owns each repository's head pointer and version.
///
/// The conditional `update_head` is the single serialization point across
/// independent writers. Implementations must reject an update whose
/// `expected_version` no longer matches, and must increment the version by
/// exactly 1 per successful update.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn create_repository(&self, name: &str) -> RemoteResult<RepoId>;

    async fn get_repository_state(&self, repo: &RepoId) -> RemoteResult<RepositoryState>;

    /// Conditionally advance the head. Returns the new version on success;
    /// fails with `VersionConflict` if another writer got there first.
    async fn update_head(
        &self,
        repo: &RepoId,
        head_commit: &RemoteId,
        head_manifest: &RemoteId,
        head_batch: &RemoteId,
        expected_version: u64,
    ) -> RemoteResult<u64>;
}

/// Content-addressed blob and batch storage.
///
/// Writes are idempotent by construction: re-uploading identical bytes
/// yields the same id, so retrying a write can never duplicate data.
#[async_trait]
pub trait ContentClient: Send + Sync {
    async fn read_blob(&self, id: &RemoteId) -> RemoteResult<Vec<u8>>;

    async fn write_blob(&self, bytes: &[u8]) -> RemoteResult<RemoteId>;

    /// Upload a set of files in one call. The receipt carries one id per
    /// file, in submission order.
    async fn write_batch(&self, files: &[BatchFile]) -> RemoteResult<BatchReceipt>;

    async fn read_batch(&self, ids: &[RemoteId]) -> RemoteResult<Vec<Vec<u8>>>;
}

/// The policy service that seals and unseals data-encryption keys.
#[async_trait]
pub trait PolicyClient: Send + Sync {
    /// Seal a key under an access policy; the result is opaque.
    async fn seal_key(&self, policy_id: &str, key: &[u8]) -> RemoteResult<Vec<u8>>;

    /// Unseal a key. The proof must satisfy the policy the key was sealed
    /// under.
    async fn unseal_key(&self, sealed: &[u8], proof: &PolicyProof) -> RemoteResult<Vec<u8>>;
}
