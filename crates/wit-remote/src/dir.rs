//! Directory-backed collaborators.
//!
//! A [`DirRemote`] keeps the ledger records and blob storage in a plain
//! directory, the way git serves `file://` remotes. It is the reference
//! backend for the CLI and for tests that need persistence; a deployment
//! implements the same traits against real network services.
//!
//! Layout:
//!
//! ```text
//! repos/<repo-id>        ledger record, canonical JSON
//! blobs/<hex>            content-addressed blobs
//! ```

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wit_hash::canonical_bytes;
use wit_types::{RemoteId, RepoId};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::{ContentClient, LedgerClient};
use crate::types::{BatchFile, BatchReceipt, RepositoryState};

#[derive(Serialize, Deserialize, Default)]
struct DirRecord {
    head_commit: Option<RemoteId>,
    head_manifest: Option<RemoteId>,
    head_batch: Option<RemoteId>,
    version: u64,
}

pub struct DirRemote {
    root: PathBuf,
}

impl DirRemote {
    pub fn open(root: impl Into<PathBuf>) -> RemoteResult<Self> {
        let root = root.into();
        for dir in ["repos", "blobs"] {
            fs::create_dir_all(root.join(dir))
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
        }
        Ok(Self { root })
    }

    fn repo_path(&self, repo: &RepoId) -> PathBuf {
        self.root.join("repos").join(repo.as_str())
    }

    fn blob_path(&self, id: &RemoteId) -> PathBuf {
        self.root
            .join("blobs")
            .join(hex::encode(id.as_str().as_bytes()))
    }

    fn read_record(&self, repo: &RepoId) -> RemoteResult<DirRecord> {
        let path = self.repo_path(repo);
        if !path.is_file() {
            return Err(RemoteError::NotFound(repo.to_string()));
        }
        let bytes = fs::read(path).map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn write_record(&self, repo: &RepoId, record: &DirRecord) -> RemoteResult<()> {
        let bytes = canonical_bytes(record).map_err(|e| RemoteError::Decode(e.to_string()))?;
        fs::write(self.repo_path(repo), bytes)
            .map_err(|e| RemoteError::Transport(e.to_string()))
    }

    fn mint_id(bytes: &[u8]) -> RemoteId {
        RemoteId::new(format!("cas-{}", hex::encode(blake3::hash(bytes).as_bytes())))
    }
}

#[async_trait]
impl LedgerClient for DirRemote {
    async fn create_repository(&self, name: &str) -> RemoteResult<RepoId> {
        let id = RepoId::new(format!("{name}-{}", Uuid::now_v7()));
        self.write_record(&id, &DirRecord::default())?;
        Ok(id)
    }

    async fn get_repository_state(&self, repo: &RepoId) -> RemoteResult<RepositoryState> {
        let record = self.read_record(repo)?;
        Ok(RepositoryState {
            head_commit: record.head_commit,
            head_manifest: record.head_manifest,
            head_batch: record.head_batch,
            version: record.version,
        })
    }

    async fn update_head(
        &self,
        repo: &RepoId,
        head_commit: &RemoteId,
        head_manifest: &RemoteId,
        head_batch: &RemoteId,
        expected_version: u64,
    ) -> RemoteResult<u64> {
        let mut record = self.read_record(repo)?;
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
        self.write_record(repo, &record)?;
        Ok(record.version)
    }
}

#[async_trait]
impl ContentClient for DirRemote {
    async fn read_blob(&self, id: &RemoteId) -> RemoteResult<Vec<u8>> {
        let path = self.blob_path(id);
        if !path.is_file() {
            return Err(RemoteError::NotFound(id.to_string()));
        }
        fs::read(path).map_err(|e| RemoteError::Transport(e.to_string()))
    }

    async fn write_blob(&self, bytes: &[u8]) -> RemoteResult<RemoteId> {
        let id = Self::mint_id(bytes);
        let path = self.blob_path(&id);
        if !path.exists() {
            fs::write(path, bytes).map_err(|e| RemoteError::Transport(e.to_string()))?;
        }
        Ok(id)
    }

    async fn write_batch(&self, files: &[BatchFile]) -> RemoteResult<BatchReceipt> {
        let mut file_ids = Vec::with_capacity(files.len());
        for file in files {
            file_ids.push(self.write_blob(&file.bytes).await?);
        }
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
