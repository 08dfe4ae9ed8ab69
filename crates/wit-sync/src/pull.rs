//! Pull and clone: fast-forward the local working copy onto the remote
//! head. Merging is explicitly out of scope; anything that is not a
//! fast-forward fails.

use std::path::PathBuf;

use tracing::info;
use wit_chain::is_ancestor;
use wit_types::{CommitId, RepoId};

use crate::error::{SyncError, SyncResult};
use crate::session::{RemoteClients, Session};
use crate::types::{FetchReport, PullReport};

impl Session {
    /// Fetch and fast-forward.
    ///
    /// Preconditions: a clean working tree (nothing untracked, modified, or
    /// deleted against the index) and an index equal to HEAD's file set.
    /// Nothing is mutated when they fail.
    pub async fn pull(&self) -> SyncResult<PullReport> {
        let status = self.status()?;
        if !status.worktree_clean() {
            return Err(SyncError::NotClean(status.dirty_paths()));
        }
        if !status.staged.is_empty() {
            return Err(SyncError::NotClean(
                status.staged.iter().map(|e| e.path.clone()).collect(),
            ));
        }

        let head = match self.fetch().await? {
            FetchReport::NoRemoteHead => return Ok(PullReport::UpToDate),
            FetchReport::Fetched { head, .. } => head,
        };

        let identity = self.identity()?;
        let target = identity.local_for(&head).ok_or_else(|| {
            SyncError::CorruptHistory(format!("fetched head {head} was not materialized"))
        })?;

        let local_head = self.head()?;
        if local_head == Some(target) {
            return Ok(PullReport::UpToDate);
        }

        let fast_forward = match local_head {
            None => true,
            Some(current) => is_ancestor(self.store(), current, target)?,
        };
        if !fast_forward {
            return Err(SyncError::NotFastForward);
        }

        self.checkout(target).await?;
        info!(to = %target.short(), "fast-forwarded");
        Ok(PullReport::FastForward {
            from: local_head,
            to: target,
        })
    }

    /// Clone a remote repository into a fresh directory.
    ///
    /// The full remote state is fetched and validated first; the working
    /// tree is only written after every integrity check has passed.
    pub async fn clone_repository(
        workdir: impl Into<PathBuf>,
        repo_id: RepoId,
        author: &str,
        remote: RemoteClients,
    ) -> SyncResult<(Session, Option<CommitId>)> {
        let session = Session::init(workdir, repo_id.as_str(), author, remote)?;
        let mut config = session.config()?;
        config.repo_id = Some(repo_id);
        session.refs().set_config(&config)?;

        match session.fetch().await? {
            FetchReport::NoRemoteHead => Ok((session, None)),
            FetchReport::Fetched { head, .. } => {
                let target = session.identity()?.local_for(&head).ok_or_else(|| {
                    SyncError::CorruptHistory(format!("fetched head {head} was not materialized"))
                })?;
                session.checkout(target).await?;
                info!(head = %target.short(), "clone complete");
                Ok((session, Some(target)))
            }
        }
    }
}
