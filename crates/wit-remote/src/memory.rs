//! In-memory collaborator fakes.
//!
//! These back the test suites and local experimentation. They honor the
//! same contracts as real services: the ledger's conditional update is the
//! only serialization point, content storage mints content-derived ids (so
//! re-uploads are idempotent), and the policy client refuses to unseal for
//! a proof that names the wrong policy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;
use wit_hash::canonical_bytes;
use wit_types::{RemoteId, RepoId};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::{ContentClient, LedgerClient, PolicyClient};
use crate::types::{BatchFile, BatchReceipt, PolicyProof, RepositoryState};

/// How the fake ledger encodes head fields in its records.
///
/// Real ledgers are inconsistent about this, which is why the decoder
/// exists; the fake can speak each dialect so every decoder arm is
/// exercised through the production path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValueEncoding {
    /// Plain JSON strings and numbers.
    #[default]
    Plain,
    /// Heads wrapped as `{"value": ...}`.
    Wrapped,
    /// Heads as byte arrays, version as a string.
    Bytes,
}

#[derive(Clone, Default)]
struct RepoRecord {
    head_commit: Option<RemoteId>,
    head_manifest: Option<RemoteId>,
    head_batch: Option<RemoteId>,
    version: u64,
}

impl RepoRecord {
    fn encode(&self, encoding: ValueEncoding) -> Value {
        let head = |id: &Option<RemoteId>| -> Value {
            match id {
                None => Value::Null,
                Some(id) => match encoding {
                    ValueEncoding::Plain => json!(id.as_str()),
                    ValueEncoding::Wrapped => json!({"value": id.as_str()}),
                    ValueEncoding::Bytes => json!(id.as_str().as_bytes().to_vec()),
                },
            }
        };
        let version = match encoding {
            ValueEncoding::Bytes => json!(self.version.to_string()),
            _ => json!(self.version),
        };
        json!({
            "head_commit": head(&self.head_commit),
            "head_manifest": head(&self.head_manifest),
            "head_batch": head(&self.head_batch),
            "version": version,
        })
    }
}

/// In-memory ledger with a conditional, versioned head pointer per repo.
pub struct InMemoryLedger {
    repos: RwLock<HashMap<RepoId, RepoRecord>>,
    encoding: ValueEncoding,
    update_calls: AtomicU64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::with_encoding(ValueEncoding::Plain)
    }

    pub fn with_encoding(encoding: ValueEncoding) -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
            encoding,
            update_calls: AtomicU64::new(0),
        }
    }

    /// How many times `update_head` has been called (successful or not).
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn create_repository(&self, name: &str) -> RemoteResult<RepoId> {
        let id = RepoId::new(format!("{name}-{}", Uuid::now_v7()));
        self.repos
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), RepoRecord::default());
        Ok(id)
    }

    async fn get_repository_state(&self, repo: &RepoId) -> RemoteResult<RepositoryState> {
        let repos = self.repos.read().expect("lock poisoned");
        let record = repos
            .get(repo)
            .ok_or_else(|| RemoteError::NotFound(repo.to_string()))?;
        // Round-trip through the wire encoding so the decoder runs on the
        // production path, not just in decoder tests.
        RepositoryState::decode(&record.encode(self.encoding))
    }

    async fn update_head(
        &self,
        repo: &RepoId,
        head_commit: &RemoteId,
        head_manifest: &RemoteId,
        head_batch: &RemoteId,
        expected_version: u64,
    ) -> RemoteResult<u64> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut repos = self.repos.write().expect("lock poisoned");
        let record = repos
            .get_mut(repo)
            .ok_or_else(|| RemoteError::NotFound(repo.to_string()))?;
        if record.version != expected_version {
            return Err(RemoteError::VersionConflict {
                expected: expected_version,
                actual: record.version,
            });
        }
        record.head_commit = Some(head_commit.clone());
        record.head_manifest = Some(head_manifest.clone());
        record.head_batch = Some(head_batch.clone());
        record.version += 1;
        Ok(record.version)
    }
}

/// In-memory content storage minting content-derived ids.
#[derive(Default)]
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<RemoteId, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    fn mint_id(bytes: &[u8]) -> RemoteId {
        RemoteId::new(format!("cas-{}", hex::encode(blake3::hash(bytes).as_bytes())))
    }
}

#[async_trait]
impl ContentClient for InMemoryContentStore {
    async fn read_blob(&self, id: &RemoteId) -> RemoteResult<Vec<u8>> {
        let blobs = self.blobs.read().expect("lock poisoned");
        blobs
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn write_blob(&self, bytes: &[u8]) -> RemoteResult<RemoteId> {
        let id = Self::mint_id(bytes);
        let mut blobs = self.blobs.write().expect("lock poisoned");
        blobs.entry(id.clone()).or_insert_with(|| bytes.to_vec());
        Ok(id)
    }

    async fn write_batch(&self, files: &[BatchFile]) -> RemoteResult<BatchReceipt> {
        let mut file_ids = Vec::with_capacity(files.len());
        for file in files {
            file_ids.push(self.write_blob(&file.bytes).await?);
        }
        // The batch record itself is a stored blob listing its files, so
        // batch ids are content-derived too.
        let record = canonical_bytes(
            &file_ids
                .iter()
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>(),
        )
        .map_err(|e| RemoteError::Decode(e.to_string()))?;
        let batch_id = self.write_blob(&record).await?;
        Ok(BatchReceipt { batch_id, file_ids })
    }

    async fn read_batch(&self, ids: &[RemoteId]) -> RemoteResult<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.read_blob(id).await?);
        }
        Ok(out)
    }
}

/// Policy client that seals by embedding the policy id alongside the key.
///
/// Unsealing checks that the presented proof names the same policy. This
/// models only the contract, not any real cryptographic sealing.
#[derive(Default)]
pub struct StaticPolicyClient;

impl StaticPolicyClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PolicyClient for StaticPolicyClient {
    async fn seal_key(&self, policy_id: &str, key: &[u8]) -> RemoteResult<Vec<u8>> {
        let policy = policy_id.as_bytes();
        if policy.len() > u8::MAX as usize {
            return Err(RemoteError::PolicyDenied("policy id too long".into()));
        }
        let mut sealed = Vec::with_capacity(1 + policy.len() + key.len());
        sealed.push(policy.len() as u8);
        sealed.extend_from_slice(policy);
        sealed.extend_from_slice(key);
        Ok(sealed)
    }

    async fn unseal_key(&self, sealed: &[u8], proof: &PolicyProof) -> RemoteResult<Vec<u8>> {
        let (&len, rest) = sealed
            .split_first()
            .ok_or_else(|| RemoteError::Decode("sealed key too short".into()))?;
        let len = len as usize;
        if rest.len() < len {
            return Err(RemoteError::Decode("sealed key truncated".into()));
        }
        let (policy, key) = rest.split_at(len);
        let policy = std::str::from_utf8(policy)
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if proof.policy_id != policy {
            return Err(RemoteError::PolicyDenied(format!(
                "proof is for policy {}, key sealed under {policy}",
                proof.policy_id
            )));
        }
        Ok(key.to_vec())
    }
}
