//! Checkout: materialize a commit's file set into the working tree.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};
use wit_chain::read_commit;
use wit_hash::ContentHasher;
use wit_index::Index;
use wit_remote::{storage_id, with_retry, Manifest};
use wit_seal::open_file;
use wit_store::{ObjectKind, ObjectStore, RemoteKind, StoredObject};
use wit_types::CommitId;

use crate::error::{SyncError, SyncResult};
use crate::session::Session;
use crate::types::CheckoutReport;

/// Bound on concurrent blob downloads within one checkout.
const MAX_PARALLEL_TRANSFERS: usize = 4;

impl Session {
    /// Make the working tree match `target`'s file set, replace the index
    /// with it, and move HEAD.
    ///
    /// File bytes come from the local store first and remote storage
    /// second; all remote bytes are verified against the recorded content
    /// hash (and decrypted when an envelope is present) before anything is
    /// written to the working tree.
    pub async fn checkout(&self, target: CommitId) -> SyncResult<CheckoutReport> {
        let commit = read_commit(self.store(), target)?;
        let files = commit.files.ok_or_else(|| {
            SyncError::CorruptHistory(format!("local commit {target} has no inline files"))
        })?;
        let index = self.load_index()?;

        // Bring every missing blob into the local store before mutating
        // anything on disk.
        let mut missing = Vec::new();
        for (path, meta) in &files {
            if !self.store().exists(&meta.content_hash)? {
                missing.push(path.clone());
            }
        }
        if !missing.is_empty() {
            self.fetch_blobs(target, &files, &missing).await?;
        }

        // Delete tracked files that the target does not have.
        let mut deleted = 0;
        for path in index.paths() {
            if !files.contains_key(path) {
                let full = self.workdir().join(path);
                if full.exists() {
                    std::fs::remove_file(&full).map_err(|e| SyncError::Storage(e.to_string()))?;
                    deleted += 1;
                }
            }
        }

        // Write the target file set.
        let mut written = 0;
        for (path, meta) in &files {
            let stored = self.store().read(&meta.content_hash)?.ok_or_else(|| {
                SyncError::BlobVerificationFailed {
                    path: path.clone(),
                    reason: "blob missing after fetch".into(),
                }
            })?;
            let full = self.workdir().join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SyncError::Storage(e.to_string()))?;
            }
            std::fs::write(&full, &stored.data).map_err(|e| SyncError::Storage(e.to_string()))?;
            restore_permissions(&full, meta.permission_class.mode_bits())?;
            written += 1;
        }

        // Replace the index wholesale and advance HEAD.
        self.save_index(&Index::from_entries(files))?;
        self.refs().set_head(Some(target))?;
        info!(commit = %target.short(), written, deleted, "checkout complete");
        Ok(CheckoutReport { written, deleted })
    }

    /// Download missing blobs with bounded concurrency. Each file is
    /// transferred and retried independently.
    async fn fetch_blobs(
        &self,
        target: CommitId,
        files: &std::collections::BTreeMap<String, wit_types::FileMetadata>,
        missing: &[String],
    ) -> SyncResult<()> {
        let identity = self.identity()?;
        let remote_id = identity.get(&target).cloned().ok_or_else(|| {
            SyncError::CorruptHistory(format!(
                "blobs for {target} are missing locally and the commit has no remote mapping"
            ))
        })?;
        let record = self.read_remote_record(&remote_id).await?;
        let (manifest_bytes, _) = self
            .fetch_remote_object(RemoteKind::Manifest, &record.manifest_id)
            .await?;
        let manifest = Manifest::from_bytes(&manifest_bytes)?;

        debug!(count = missing.len(), "downloading missing blobs");
        let semaphore = Arc::new(Semaphore::new(MAX_PARALLEL_TRANSFERS));
        let mut transfers = JoinSet::new();
        for path in missing {
            let entry = manifest.files.get(path).cloned().ok_or_else(|| {
                SyncError::CorruptHistory(format!("manifest has no entry for {path}"))
            })?;
            let expected = files
                .get(path)
                .map(|m| m.content_hash)
                .ok_or_else(|| {
                    SyncError::CorruptHistory(format!("missing metadata for {path}"))
                })?;

            let content = self.clients().content.clone();
            let policy = self.clients().policy.clone();
            let proof = self.clients().proof.clone();
            let retry = self.clients().retry;
            let store = self.store_arc();
            let semaphore = semaphore.clone();
            let path = path.clone();

            transfers.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                let sid = storage_id(&entry);
                let raw = with_retry(&retry, "read_blob", || content.read_blob(&sid)).await?;

                let plain = match &entry.meta.encryption {
                    Some(envelope) => {
                        let (Some(policy), Some(proof)) = (&policy, &proof) else {
                            return Err(SyncError::PolicyDenied(format!(
                                "{path} is encrypted and no policy proof is available"
                            )));
                        };
                        open_file(policy.as_ref(), proof, envelope, &raw).await?
                    }
                    None => raw,
                };

                if !ContentHasher::BLOB.verify(&plain, &expected) {
                    return Err(SyncError::BlobVerificationFailed {
                        path,
                        reason: "downloaded bytes do not match the recorded content hash".into(),
                    });
                }
                store.write(&StoredObject::new(ObjectKind::Blob, plain))?;
                Ok(())
            });
        }

        while let Some(joined) = transfers.join_next().await {
            joined.map_err(|e| SyncError::Storage(e.to_string()))??;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restore_permissions(path: &std::path::Path, mode: u32) -> SyncResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| SyncError::Storage(e.to_string()))
}

#[cfg(not(unix))]
fn restore_permissions(_path: &std::path::Path, _mode: u32) -> SyncResult<()> {
    Ok(())
}
