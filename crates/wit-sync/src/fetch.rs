//! Fetch: pull down and validate remote state without touching the
//! working tree or local HEAD.
//!
//! Every downloaded commit record and manifest is validated before it is
//! cached: the manifest must reproduce its declared root hash, and the
//! record must agree with its manifest. The walk stops at the first id the
//! cache already holds (cached ⇒ validated ⇒ ancestors present).

use std::collections::BTreeMap;

use tracing::info;
use wit_chain::Commit;
use wit_refs::RemoteHead;
use wit_remote::{with_retry, Manifest, RemoteCommitRecord};
use wit_store::{ObjectStore, RemoteCache, RemoteKind};
use wit_types::{CommitId, FileMetadata, RemoteId};

use crate::error::{SyncError, SyncResult};
use crate::session::Session;
use crate::types::FetchReport;

impl Session {
    /// Read a remote object, preferring the local cache.
    ///
    /// Returns the bytes and whether they came from the network (fresh
    /// bytes must be validated before being cached by the caller).
    pub(crate) async fn fetch_remote_object(
        &self,
        kind: RemoteKind,
        id: &RemoteId,
    ) -> SyncResult<(Vec<u8>, bool)> {
        if let Some(bytes) = self.cache().get(kind, id)? {
            return Ok((bytes, false));
        }
        let content = self.clients().content.clone();
        let retry = self.clients().retry;
        let bytes = with_retry(&retry, "read_blob", || content.read_blob(id)).await?;
        Ok((bytes, true))
    }

    pub(crate) async fn read_remote_record(
        &self,
        id: &RemoteId,
    ) -> SyncResult<RemoteCommitRecord> {
        let (bytes, _) = self.fetch_remote_object(RemoteKind::Commit, id).await?;
        Ok(RemoteCommitRecord::from_bytes(&bytes)?)
    }

    /// Download and validate one remote commit and its manifest; cache
    /// both only after validation passes.
    async fn fetch_validated(
        &self,
        commit_id: &RemoteId,
    ) -> SyncResult<(RemoteCommitRecord, Manifest)> {
        let (record_bytes, record_fresh) =
            self.fetch_remote_object(RemoteKind::Commit, commit_id).await?;
        let record = RemoteCommitRecord::from_bytes(&record_bytes)?;

        let (manifest_bytes, manifest_fresh) = self
            .fetch_remote_object(RemoteKind::Manifest, &record.manifest_id)
            .await?;
        let manifest = Manifest::from_bytes(&manifest_bytes)?;

        if manifest.compute_root_hash()? != manifest.root_hash {
            return Err(SyncError::ManifestMismatch(record.manifest_id.clone()));
        }
        if record.tree_root_hash != manifest.root_hash {
            return Err(SyncError::CommitManifestMismatch(commit_id.clone()));
        }

        if manifest_fresh {
            self.cache()
                .put(RemoteKind::Manifest, &record.manifest_id, &manifest_bytes)?;
        }
        if record_fresh {
            self.cache().put(RemoteKind::Commit, commit_id, &record_bytes)?;
        }
        Ok((record, manifest))
    }

    /// Refresh the local view of the remote: download and validate the head
    /// and any unseen ancestors, then update the remote-tracking cache.
    pub async fn fetch(&self) -> SyncResult<FetchReport> {
        let config = self.config()?;
        let repo_id = config.repo_id.clone().ok_or(SyncError::NoRemote)?;

        let ledger = self.clients().ledger.clone();
        let retry = self.clients().retry;
        let state = with_retry(&retry, "get_repository_state", || {
            ledger.get_repository_state(&repo_id)
        })
        .await?;

        let Some(head) = state.head_commit.clone() else {
            return Ok(FetchReport::NoRemoteHead);
        };
        let head_manifest = state.head_manifest.clone().ok_or_else(|| {
            SyncError::CorruptHistory("remote head commit without a head manifest".into())
        })?;
        let head_batch = state.head_batch.clone().ok_or_else(|| {
            SyncError::CorruptHistory("remote head commit without a head batch".into())
        })?;

        // Walk the remote parent chain newest-first.
        let mut chain: Vec<(RemoteId, RemoteCommitRecord, Manifest)> = Vec::new();
        let mut new_commits = 0;
        let mut cursor = Some(head.clone());
        while let Some(commit_id) = cursor.take() {
            let was_cached = self.cache().contains(RemoteKind::Commit, &commit_id)?;
            let (record, manifest) = self.fetch_validated(&commit_id).await?;
            if !was_cached {
                new_commits += 1;
                cursor = record.parent.clone();
            }
            chain.push((commit_id, record, manifest));
        }

        self.materialize(&chain)?;

        self.refs().set_remote_head(&RemoteHead {
            commit: head.clone(),
            manifest: head_manifest,
            batch: head_batch,
            version: state.version,
        })?;
        info!(new_commits, head = %head.short(), "fetch complete");
        Ok(FetchReport::Fetched { head, new_commits })
    }

    /// Build local commit equivalents for fetched remote commits, oldest
    /// first, and record their identities.
    ///
    /// The reconstruction strips encryption envelopes from file metadata
    /// (envelopes belong to manifest entries), so the derived local id is
    /// byte-identical to the one the original pusher computed.
    fn materialize(
        &self,
        chain: &[(RemoteId, RemoteCommitRecord, Manifest)],
    ) -> SyncResult<()> {
        let mut identity = self.identity()?;
        for (remote_id, record, manifest) in chain.iter().rev() {
            if identity.local_for(remote_id).is_some() {
                continue;
            }
            let parent = match &record.parent {
                None => None,
                Some(parent_remote) => {
                    Some(identity.local_for(parent_remote).ok_or_else(|| {
                        SyncError::CorruptHistory(format!(
                            "remote parent {parent_remote} has no local materialization"
                        ))
                    })?)
                }
            };
            let files: BTreeMap<String, FileMetadata> = manifest
                .files
                .iter()
                .map(|(path, entry)| (path.clone(), entry.meta.without_encryption()))
                .collect();
            let commit = Commit {
                tree_root_hash: record.tree_root_hash,
                manifest_id: None,
                batch_id: None,
                files: Some(files),
                parent,
                author: record.author.clone(),
                message: record.message.clone(),
                timestamp_secs: record.timestamp_secs,
                extras: record.extras.clone(),
            };
            let local_id = CommitId::new(
                self.store()
                    .write(&commit.to_stored_object().map_err(SyncError::from)?)?,
            );
            identity.record(local_id, remote_id.clone())?;
        }
        Ok(())
    }
}
