//! Push: mirror local history to the remote pointer and blob storage.
//!
//! The protocol uploads the unmapped suffix of the commit chain oldest
//! first, recording each commit in the identity map the moment its upload
//! lands. The conditional pointer update at the end is the only
//! serialization point: if another writer advanced the version, the push
//! fails as divergence and the already-recorded identity entries make the
//! next attempt resume instead of re-uploading.

use std::collections::BTreeMap;

use tracing::{debug, info};
use wit_chain::{read_commit, walk_chain, Commit};
use wit_hash::ContentHasher;
use wit_index::root_hash_of;
use wit_refs::RemoteHead;
use wit_remote::{with_retry, BatchFile, Manifest, ManifestEntry, RemoteCommitRecord};
use wit_seal::seal_file;
use wit_store::{ObjectStore, RemoteCache, RemoteKind};
use wit_types::{CommitId, RemoteId};

use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityMap;
use crate::session::Session;
use crate::types::PushReport;

impl Session {
    pub async fn push(&self) -> SyncResult<PushReport> {
        let head_id = self.head()?.ok_or(SyncError::NothingToPush)?;
        let head_commit = read_commit(self.store(), head_id)?;
        let head_files = head_commit.files.as_ref().ok_or_else(|| {
            SyncError::CorruptHistory(format!("local commit {head_id} has no inline files"))
        })?;

        // Defend against a corrupted index: the recorded tree root hash
        // must still be derivable from the commit's own file set.
        let recomputed = root_hash_of(head_files.iter())?;
        if recomputed != head_commit.tree_root_hash {
            return Err(SyncError::RootHashMismatch {
                commit: head_id,
                expected: head_commit.tree_root_hash,
                actual: recomputed,
            });
        }

        // Untracked → Tracked: mint the remote repository on first push.
        let mut config = self.config()?;
        let repo_id = match &config.repo_id {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .clients()
                    .ledger
                    .create_repository(&config.repo_name)
                    .await?;
                config.repo_id = Some(id.clone());
                self.refs().set_config(&config)?;
                info!(repo = %id, "created remote repository");
                id
            }
        };

        let mut identity = self.identity()?;

        // Collect the unmapped suffix of the chain, stopping at the first
        // ancestor the identity map already knows (or the chain's origin).
        let mut pending: Vec<(CommitId, Commit)> = Vec::new();
        let mut base_remote: Option<RemoteId> = None;
        for step in walk_chain(self.store(), head_id) {
            let (id, commit) = step?;
            if let Some(remote) = identity.get(&id) {
                base_remote = Some(remote.clone());
                break;
            }
            pending.push((id, commit));
        }
        pending.reverse(); // oldest first

        let retry = self.clients().retry;
        let ledger = self.clients().ledger.clone();
        let state = with_retry(&retry, "get_repository_state", || {
            ledger.get_repository_state(&repo_id)
        })
        .await?;

        // Idempotent no-op: the remote head is already our head's identity.
        // The pointer-update endpoint is not called.
        if pending.is_empty() {
            if let (Some(base), Some(remote_head)) = (&base_remote, &state.head_commit) {
                if base == remote_head {
                    info!("already up to date");
                    return Ok(PushReport::UpToDate);
                }
            }
        }

        // Divergence check. In the common case the remote head must equal
        // the base this push extends. After a crashed push the remote head
        // can sit deeper in our mapped history (commits uploaded, pointer
        // not yet advanced). That is resumable, not divergence.
        if let Some(remote_head) = &state.head_commit {
            if base_remote.as_ref() != Some(remote_head)
                && !self.remote_head_in_history(&identity, head_id, remote_head)?
            {
                return Err(SyncError::Diverged(format!(
                    "remote head {remote_head} is not in local history; fetch and fast-forward first"
                )));
            }
        }

        // Upload oldest → newest.
        let count = pending.len();
        let mut parent_remote = base_remote.clone();
        let mut last: Option<(RemoteId, RemoteId, RemoteId)> = None;
        for (local_id, commit) in &pending {
            let uploaded = self
                .push_one(local_id, commit, parent_remote.as_ref(), &mut identity)
                .await?;
            parent_remote = Some(uploaded.0.clone());
            last = Some(uploaded);
        }

        // Nothing newly uploaded means a previous attempt already uploaded
        // everything and only the pointer update is behind.
        let (last_commit, last_manifest, last_batch) = match last {
            Some(ids) => ids,
            None => {
                let base = base_remote.ok_or(SyncError::NothingToPush)?;
                let record = self.read_remote_record(&base).await?;
                (base, record.manifest_id, record.batch_id)
            }
        };

        // The conditional update. Never retried: a version mismatch means a
        // concurrent writer won, and must surface as divergence.
        let new_version = self
            .clients()
            .ledger
            .update_head(
                &repo_id,
                &last_commit,
                &last_manifest,
                &last_batch,
                state.version,
            )
            .await?;

        self.refs().set_remote_head(&RemoteHead {
            commit: last_commit.clone(),
            manifest: last_manifest,
            batch: last_batch,
            version: new_version,
        })?;
        info!(commits = count, version = new_version, "push complete");
        Ok(PushReport::Pushed {
            commits: count,
            head: last_commit,
            new_version,
        })
    }

    fn remote_head_in_history(
        &self,
        identity: &IdentityMap,
        head: CommitId,
        remote_head: &RemoteId,
    ) -> SyncResult<bool> {
        for step in walk_chain(self.store(), head) {
            let (id, _) = step?;
            if identity.get(&id) == Some(remote_head) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Upload one commit: verified batch, manifest, then the commit record.
    /// The identity map is updated the moment the record upload succeeds.
    async fn push_one(
        &self,
        local_id: &CommitId,
        commit: &Commit,
        parent_remote: Option<&RemoteId>,
        identity: &mut IdentityMap,
    ) -> SyncResult<(RemoteId, RemoteId, RemoteId)> {
        let files = commit.files.as_ref().ok_or_else(|| {
            SyncError::CorruptHistory(format!("local commit {local_id} has no inline files"))
        })?;

        let config = self.config()?;
        let sealing = match (&config.policy_id, &self.clients().policy) {
            (Some(policy_id), Some(client)) => Some((policy_id.clone(), client.clone())),
            (Some(_), None) => {
                return Err(SyncError::PolicyDenied(
                    "encryption is configured but no policy service is available".into(),
                ))
            }
            _ => None,
        };

        // Verify every referenced blob against its metadata before moving
        // a single byte.
        let mut batch_files = Vec::with_capacity(files.len());
        let mut entries: BTreeMap<String, ManifestEntry> = BTreeMap::new();
        for (path, meta) in files {
            let stored = self.store().read(&meta.content_hash)?.ok_or_else(|| {
                SyncError::BlobVerificationFailed {
                    path: path.clone(),
                    reason: "blob missing from local store".into(),
                }
            })?;
            if !ContentHasher::BLOB.verify(&stored.data, &meta.content_hash) {
                return Err(SyncError::BlobVerificationFailed {
                    path: path.clone(),
                    reason: "stored bytes do not match the recorded content hash".into(),
                });
            }
            if stored.data.len() as u64 != meta.size {
                return Err(SyncError::BlobVerificationFailed {
                    path: path.clone(),
                    reason: format!(
                        "stored size {} does not match recorded size {}",
                        stored.data.len(),
                        meta.size
                    ),
                });
            }

            let mut entry_meta = meta.clone();
            let upload_bytes = match &sealing {
                Some((policy_id, client)) => {
                    let sealed = seal_file(client.as_ref(), policy_id, &stored.data).await?;
                    entry_meta.encryption = Some(sealed.envelope);
                    sealed.ciphertext
                }
                None => stored.data,
            };
            batch_files.push(BatchFile {
                path: path.clone(),
                bytes: upload_bytes,
            });
            entries.insert(
                path.clone(),
                ManifestEntry {
                    meta: entry_meta,
                    remote_file_id: None,
                    legacy_blob_ref: None,
                },
            );
        }

        let retry = self.clients().retry;
        let content = self.clients().content.clone();

        // Content-addressed write: retry-safe by construction.
        let receipt = with_retry(&retry, "write_batch", || content.write_batch(&batch_files))
            .await?;
        for (file, file_id) in batch_files.iter().zip(&receipt.file_ids) {
            if let Some(entry) = entries.get_mut(&file.path) {
                entry.remote_file_id = Some(file_id.clone());
            }
        }

        let manifest = Manifest {
            root_hash: commit.tree_root_hash,
            batch_id: receipt.batch_id.clone(),
            files: entries,
        };
        // Re-verify before the manifest leaves this machine.
        if manifest.compute_root_hash()? != commit.tree_root_hash {
            return Err(SyncError::RootHashMismatch {
                commit: *local_id,
                expected: commit.tree_root_hash,
                actual: manifest.compute_root_hash()?,
            });
        }
        let manifest_bytes = manifest.canonical_bytes()?;
        let manifest_id = with_retry(&retry, "write_manifest", || {
            content.write_blob(&manifest_bytes)
        })
        .await?;

        // The remote record replaces inline files with the manifest/batch
        // pair and links to the parent's *remote* identity.
        let record = RemoteCommitRecord {
            tree_root_hash: commit.tree_root_hash,
            manifest_id: manifest_id.clone(),
            batch_id: receipt.batch_id.clone(),
            parent: parent_remote.cloned(),
            author: commit.author.clone(),
            message: commit.message.clone(),
            timestamp_secs: commit.timestamp_secs,
            extras: commit.extras.clone(),
        };
        let record_bytes = record.canonical_bytes()?;
        let remote_id = with_retry(&retry, "write_commit_record", || {
            content.write_blob(&record_bytes)
        })
        .await?;

        self.cache()
            .put(RemoteKind::Manifest, &manifest_id, &manifest_bytes)?;
        self.cache().put(RemoteKind::Commit, &remote_id, &record_bytes)?;

        // Recorded immediately, not deferred: this is the resumption point
        // a crashed push restarts from.
        identity.record(*local_id, remote_id.clone())?;
        debug!(local = %local_id.short(), remote = %remote_id.short(), "commit uploaded");

        Ok((remote_id, manifest_id, receipt.batch_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::Harness;
    use crate::state::SyncState;
    use wit_store::ObjectStore;

    fn stage_and_commit(session: &Session, rel: &str, content: &[u8], ts: u64) -> CommitId {
        Harness::write_file(session, rel, content);
        session.add(&[rel.to_string()]).unwrap();
        session.commit_at(&format!("commit {rel}@{ts}"), ts).unwrap()
    }

    #[tokio::test]
    async fn push_without_commits_fails() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        let err = session.push().await.unwrap_err();
        assert!(matches!(err, SyncError::NothingToPush));
    }

    #[tokio::test]
    async fn first_push_moves_version_zero_to_one() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        stage_and_commit(&session, "a.txt", b"hello", 100);

        let report = session.push().await.unwrap();
        let PushReport::Pushed {
            commits,
            new_version,
            ..
        } = report
        else {
            panic!("expected a push");
        };
        assert_eq!(commits, 1);
        assert_eq!(new_version, 1);

        // Repo id was minted and persisted; state is now synced.
        assert!(session.config().unwrap().repo_id.is_some());
        assert_eq!(session.sync_state().unwrap(), SyncState::Synced);
    }

    #[tokio::test]
    async fn second_push_is_idempotent_noop() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        stage_and_commit(&session, "a.txt", b"hello", 100);

        session.push().await.unwrap();
        let calls_after_first = h.ledger.update_calls();

        let report = session.push().await.unwrap();
        assert_eq!(report, PushReport::UpToDate);
        // The pointer-update endpoint was not called again.
        assert_eq!(h.ledger.update_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn push_uploads_only_unmapped_commits() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        stage_and_commit(&session, "a.txt", b"v1", 100);
        session.push().await.unwrap();

        stage_and_commit(&session, "a.txt", b"v2", 200);
        stage_and_commit(&session, "a.txt", b"v3", 300);
        let report = session.push().await.unwrap();
        let PushReport::Pushed {
            commits,
            new_version,
            ..
        } = report
        else {
            panic!("expected a push");
        };
        assert_eq!(commits, 2);
        assert_eq!(new_version, 2);
    }

    #[tokio::test]
    async fn identity_map_records_every_pushed_commit() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        let c1 = stage_and_commit(&session, "a.txt", b"v1", 100);
        let c2 = stage_and_commit(&session, "a.txt", b"v2", 200);
        session.push().await.unwrap();

        let identity = session.identity().unwrap();
        assert!(identity.get(&c1).is_some());
        assert!(identity.get(&c2).is_some());
        assert_ne!(identity.get(&c1), identity.get(&c2));
    }

    #[tokio::test]
    async fn concurrent_writer_causes_divergence() {
        let h = Harness::new();

        // X creates the repo and pushes C1 (remote: version 1, head H1).
        let x = h.init_repo("client-x");
        stage_and_commit(&x, "a.txt", b"base", 100);
        x.push().await.unwrap();

        // Y syncs to version-1 state: same repo id, pulled onto H1.
        let y = h.init_repo("client-y");
        let mut y_config = y.config().unwrap();
        y_config.repo_id = x.config().unwrap().repo_id;
        y.refs().set_config(&y_config).unwrap();
        y.pull().await.unwrap();

        // X pushes C2: remote is now at version 2, head H2.
        stage_and_commit(&x, "a.txt", b"from x", 200);
        x.push().await.unwrap();

        // Y, still holding version-1 state, commits on top of C1 and
        // pushes. Its base is H1, the remote head is H2: Diverged.
        stage_and_commit(&y, "b.txt", b"from y", 150);
        let err = y.push().await.unwrap_err();
        assert!(matches!(err, SyncError::Diverged(_)));
    }

    #[tokio::test]
    async fn corrupted_blob_fails_verification_before_upload() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        let head = stage_and_commit(&session, "a.txt", b"honest bytes", 100);

        // Remove the blob file behind the store's back; the pre-upload
        // verification must notice before anything is transferred.
        let commit = read_commit(session.store(), head).unwrap();
        let meta = commit.files.as_ref().unwrap().get("a.txt").unwrap().clone();
        let blob_path = session
            .workdir()
            .join(".wit/objects/blobs")
            .join(hex::encode(meta.content_hash.as_bytes()));
        std::fs::remove_file(blob_path).unwrap();

        let err = session.push().await.unwrap_err();
        assert!(matches!(err, SyncError::BlobVerificationFailed { .. }));
    }

    #[tokio::test]
    async fn root_hash_mismatch_aborts_push() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        stage_and_commit(&session, "a.txt", b"bytes", 100);

        // Forge a head commit whose tree root hash disagrees with its
        // files, and point HEAD at it.
        let head = session.head().unwrap().unwrap();
        let mut forged = read_commit(session.store(), head).unwrap();
        forged.tree_root_hash =
            wit_types::RootHash::new(wit_types::ContentHash::from_bytes(b"wrong"));
        let forged_id =
            CommitId::new(session.store().write(&forged.to_stored_object().unwrap()).unwrap());
        session.refs().set_head(Some(forged_id)).unwrap();

        let err = session.push().await.unwrap_err();
        assert!(matches!(err, SyncError::RootHashMismatch { .. }));
    }

    #[tokio::test]
    async fn interrupted_push_resumes_without_reupload() {
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use wit_remote::{LedgerClient, RemoteError, RemoteResult, RepositoryState};
        use wit_types::RepoId;

        /// Ledger that drops the connection on the first pointer update,
        /// after the commits have uploaded and the identity map recorded.
        struct CrashingLedger {
            inner: Arc<wit_remote::InMemoryLedger>,
            crashed: AtomicBool,
        }

        #[async_trait]
        impl LedgerClient for CrashingLedger {
            async fn create_repository(&self, name: &str) -> RemoteResult<RepoId> {
                self.inner.create_repository(name).await
            }
            async fn get_repository_state(&self, repo: &RepoId) -> RemoteResult<RepositoryState> {
                self.inner.get_repository_state(repo).await
            }
            async fn update_head(
                &self,
                repo: &RepoId,
                head_commit: &RemoteId,
                head_manifest: &RemoteId,
                head_batch: &RemoteId,
                expected_version: u64,
            ) -> RemoteResult<u64> {
                if !self.crashed.swap(true, Ordering::SeqCst) {
                    return Err(RemoteError::Transport("connection dropped".into()));
                }
                self.inner
                    .update_head(repo, head_commit, head_manifest, head_batch, expected_version)
                    .await
            }
        }

        let h = Harness::new();
        let crashing = Arc::new(CrashingLedger {
            inner: h.ledger.clone(),
            crashed: AtomicBool::new(false),
        });
        let workdir = h.dir.path().join("repo");
        std::fs::create_dir_all(&workdir).unwrap();
        let mut clients = h.clients();
        clients.ledger = crashing;
        let session = Session::init(workdir, "project", "alice", clients).unwrap();

        stage_and_commit(&session, "a.txt", b"v1", 100);

        // First attempt: uploads land, identity is recorded, then the
        // pointer update dies.
        let err = session.push().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        let head = session.head().unwrap().unwrap();
        assert!(session.identity().unwrap().get(&head).is_some());
        let blobs_after_crash = h.content.blob_count();

        // Second attempt: nothing re-uploads; only the pointer advances.
        let report = session.push().await.unwrap();
        let PushReport::Pushed {
            commits,
            new_version,
            ..
        } = report
        else {
            panic!("expected a push");
        };
        assert_eq!(commits, 0);
        assert_eq!(new_version, 1);
        assert_eq!(h.content.blob_count(), blobs_after_crash);
    }
}
