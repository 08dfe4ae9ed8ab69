//! The per-invocation session context.
//!
//! One [`Session`] is constructed per invocation and passed by reference
//! through every operation. It replaces any notion of process-global
//! service handles: the remote clients, stores, and refs all live here.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;
use wit_chain::{create_commit, read_commit, walk_chain};
use wit_index::{compute_meta_for_path, diff, normalize_path, Index, Walk};
use wit_refs::{FsRefStore, RefStore, RepoConfig};
use wit_remote::{ContentClient, LedgerClient, PolicyClient, PolicyProof, RetryPolicy};
use wit_store::{FsStore, ObjectKind, ObjectStore, RemoteCache, StoredObject};
use wit_types::CommitId;

use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityMap;
use crate::state::SyncState;
use crate::types::{LogEntry, StatusReport};

pub use wit_index::walk::STATE_DIR;

/// The remote collaborator clients for one session.
#[derive(Clone)]
pub struct RemoteClients {
    pub ledger: Arc<dyn LedgerClient>,
    pub content: Arc<dyn ContentClient>,
    pub policy: Option<Arc<dyn PolicyClient>>,
    /// The caller's proof of policy satisfaction, needed to decrypt.
    pub proof: Option<PolicyProof>,
    pub retry: RetryPolicy,
}

impl RemoteClients {
    pub fn new(ledger: Arc<dyn LedgerClient>, content: Arc<dyn ContentClient>) -> Self {
        Self {
            ledger,
            content,
            policy: None,
            proof: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_policy(
        mut self,
        policy: Arc<dyn PolicyClient>,
        proof: PolicyProof,
    ) -> Self {
        self.policy = Some(policy);
        self.proof = Some(proof);
        self
    }
}

pub struct Session {
    workdir: PathBuf,
    state_dir: PathBuf,
    store: Arc<dyn ObjectStore>,
    cache: Arc<dyn RemoteCache>,
    refs: Arc<dyn RefStore>,
    remote: RemoteClients,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("workdir", &self.workdir)
            .field("state_dir", &self.state_dir)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Initialize a new repository at `workdir`.
    pub fn init(
        workdir: impl Into<PathBuf>,
        repo_name: &str,
        author: &str,
        remote: RemoteClients,
    ) -> SyncResult<Self> {
        let workdir = workdir.into();
        let state_dir = workdir.join(STATE_DIR);
        if state_dir.join("HEAD").exists() {
            return Err(SyncError::Storage(format!(
                "already a wit repository: {}",
                workdir.display()
            )));
        }
        std::fs::create_dir_all(&state_dir).map_err(|e| SyncError::Storage(e.to_string()))?;

        let store = Arc::new(FsStore::open(&state_dir)?);
        let refs = FsRefStore::init(&state_dir, &RepoConfig::new(repo_name, author))?;
        Index::new().save(&state_dir.join("index"))?;
        info!(workdir = %workdir.display(), "initialized repository");

        Ok(Self {
            workdir,
            state_dir,
            cache: store.clone(),
            store,
            refs: Arc::new(refs),
            remote,
        })
    }

    /// Open an existing repository at `workdir`.
    pub fn open(workdir: impl Into<PathBuf>, remote: RemoteClients) -> SyncResult<Self> {
        let workdir = workdir.into();
        let state_dir = workdir.join(STATE_DIR);
        let refs = FsRefStore::open(&state_dir)?;
        let store = Arc::new(FsStore::open(&state_dir)?);
        Ok(Self {
            workdir,
            state_dir,
            cache: store.clone(),
            store,
            refs: Arc::new(refs),
            remote,
        })
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn head(&self) -> SyncResult<Option<CommitId>> {
        Ok(self.refs.head()?)
    }

    pub fn config(&self) -> SyncResult<RepoConfig> {
        Ok(self.refs.config()?)
    }

    /// The cached remote pointer (refreshed by fetch and push).
    pub fn remote_head(&self) -> SyncResult<Option<wit_refs::RemoteHead>> {
        Ok(self.refs.remote_head()?)
    }

    pub(crate) fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub(crate) fn store_arc(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub(crate) fn cache(&self) -> &dyn RemoteCache {
        self.cache.as_ref()
    }

    pub(crate) fn refs(&self) -> &dyn RefStore {
        self.refs.as_ref()
    }

    pub(crate) fn clients(&self) -> &RemoteClients {
        &self.remote
    }

    fn index_path(&self) -> PathBuf {
        self.state_dir.join("index")
    }

    pub(crate) fn load_index(&self) -> SyncResult<Index> {
        Ok(Index::load(&self.index_path())?)
    }

    pub(crate) fn save_index(&self, index: &Index) -> SyncResult<()> {
        Ok(index.save(&self.index_path())?)
    }

    pub(crate) fn identity(&self) -> SyncResult<IdentityMap> {
        IdentityMap::load(self.state_dir.join("identity"))
    }

    pub(crate) fn now_secs() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// The HEAD commit's file set as an index; empty before any commit.
    pub(crate) fn head_files_index(&self) -> SyncResult<Index> {
        let Some(head) = self.refs.head()? else {
            return Ok(Index::new());
        };
        let commit = read_commit(self.store(), head)?;
        let files = commit.files.ok_or_else(|| {
            SyncError::CorruptHistory(format!("local commit {head} has no inline files"))
        })?;
        Ok(Index::from_entries(files))
    }

    // ---------------------------------------------------------------
    // Local operations
    // ---------------------------------------------------------------

    /// Stage paths. Directory arguments stage everything unignored beneath
    /// them; explicit file arguments stage the file regardless of ignore
    /// rules (adding is what makes a path tracked).
    pub fn add(&self, paths: &[String]) -> SyncResult<Vec<String>> {
        let mut index = self.load_index()?;
        let mut staged = Vec::new();

        for raw in paths {
            let full = self.workdir.join(raw);
            if full.is_dir() {
                let prefix = if raw == "." {
                    String::new()
                } else {
                    format!("{}/", normalize_path(Path::new(raw))?)
                };
                let tracked: Vec<String> = index.paths().cloned().collect();
                for entry in Walk::new(&self.workdir, tracked)? {
                    let rel = entry?;
                    if prefix.is_empty() || rel.starts_with(&prefix) {
                        self.stage_file(&mut index, &rel)?;
                        staged.push(rel);
                    }
                }
            } else if full.is_file() {
                let rel = normalize_path(Path::new(raw))?;
                self.stage_file(&mut index, &rel)?;
                staged.push(rel);
            } else {
                return Err(SyncError::Storage(format!("no such path: {raw}")));
            }
        }

        staged.sort();
        staged.dedup();
        self.save_index(&index)?;
        Ok(staged)
    }

    fn stage_file(&self, index: &mut Index, rel: &str) -> SyncResult<()> {
        let (meta, bytes) = compute_meta_for_path(&self.workdir.join(rel))?;
        self.store
            .write(&StoredObject::new(ObjectKind::Blob, bytes))?;
        index.insert(rel, meta)?;
        Ok(())
    }

    /// Commit the staged index with the current wall clock.
    pub fn commit(&self, message: &str) -> SyncResult<CommitId> {
        self.commit_at(message, Self::now_secs())
    }

    /// Commit with an explicit timestamp (the commit id derives from it).
    pub fn commit_at(&self, message: &str, timestamp_secs: u64) -> SyncResult<CommitId> {
        let index = self.load_index()?;
        let config = self.refs.config()?;
        let parent = self.refs.head()?;
        let (id, _) = create_commit(
            self.store(),
            &index,
            parent,
            &config.author,
            message,
            timestamp_secs,
        )?;
        self.refs.set_head(Some(id))?;
        info!(commit = %id.short(), "created commit");
        Ok(id)
    }

    /// Working-tree and index status.
    pub fn status(&self) -> SyncResult<StatusReport> {
        let index = self.load_index()?;
        let mut report = StatusReport::default();

        let tracked: Vec<String> = index.paths().cloned().collect();
        let mut seen = HashSet::new();
        for entry in Walk::new(&self.workdir, tracked)? {
            let rel = entry?;
            match index.get(&rel) {
                None => report.untracked.push(rel),
                Some(meta) => {
                    seen.insert(rel.clone());
                    let (disk_meta, _) = compute_meta_for_path(&self.workdir.join(&rel))?;
                    if !disk_meta.same_content(meta) {
                        report.modified.push(rel);
                    }
                }
            }
        }
        for path in index.paths() {
            if !seen.contains(path) {
                report.deleted.push(path.clone());
            }
        }

        report.untracked.sort();
        report.modified.sort();
        report.deleted.sort();
        report.staged = diff(&self.head_files_index()?, &index);
        report.state = self.sync_state()?;
        Ok(report)
    }

    /// Classify this repository's state relative to the remote, using only
    /// local knowledge (config, identity map, cached remote pointer).
    pub fn sync_state(&self) -> SyncResult<SyncState> {
        let config = self.refs.config()?;
        if config.repo_id.is_none() {
            return Ok(SyncState::Untracked);
        }
        let Some(head) = self.refs.head()? else {
            return Ok(SyncState::Tracked);
        };
        let Some(remote) = self.refs.remote_head()? else {
            return Ok(SyncState::Ahead);
        };
        let identity = self.identity()?;
        if identity.get(&head) == Some(&remote.commit) {
            return Ok(SyncState::Synced);
        }
        for step in walk_chain(self.store(), head) {
            let (id, _) = step?;
            if identity.get(&id) == Some(&remote.commit) {
                return Ok(SyncState::Ahead);
            }
        }
        Ok(SyncState::Diverged)
    }

    /// History newest-first, annotated with remote identities.
    pub fn log(&self, limit: usize) -> SyncResult<Vec<LogEntry>> {
        let Some(head) = self.refs.head()? else {
            return Ok(Vec::new());
        };
        let identity = self.identity()?;
        walk_chain(self.store(), head)
            .take(limit)
            .map(|step| {
                let (id, commit) = step?;
                Ok(LogEntry {
                    id,
                    remote_id: identity.get(&id).cloned(),
                    author: commit.author,
                    message: commit.message,
                    timestamp_secs: commit.timestamp_secs,
                })
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use wit_index::ChangeKind;

    #[test]
    fn init_creates_layout() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        assert!(session.workdir().join(".wit/HEAD").is_file());
        assert!(session.workdir().join(".wit/index").is_file());
        assert!(session.head().unwrap().is_none());
    }

    #[test]
    fn init_twice_fails() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        let err = Session::init(session.workdir(), "project", "alice", h.clients()).unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
    }

    #[test]
    fn open_missing_repo_fails() {
        let h = Harness::new();
        let err = Session::open(h.dir.path().join("nowhere"), h.clients()).unwrap_err();
        assert!(matches!(err, SyncError::NotARepository(_)));
    }

    #[test]
    fn add_stages_file_and_blob() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "a.txt", b"hello");

        let staged = session.add(&["a.txt".into()]).unwrap();
        assert_eq!(staged, vec!["a.txt"]);

        let index = session.load_index().unwrap();
        let meta = index.get("a.txt").unwrap();
        assert_eq!(meta.size, 5);
        // The blob landed in the local store under its content hash.
        assert!(session.store().exists(&meta.content_hash).unwrap());
    }

    #[test]
    fn add_directory_stages_subtree() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "src/main.txt", b"m");
        Harness::write_file(&session, "src/lib.txt", b"l");
        Harness::write_file(&session, "other.txt", b"o");

        let staged = session.add(&["src".into()]).unwrap();
        assert_eq!(staged, vec!["src/lib.txt", "src/main.txt"]);
    }

    #[test]
    fn add_missing_path_fails() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        assert!(session.add(&["ghost.txt".into()]).is_err());
    }

    #[test]
    fn commit_advances_head() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "a.txt", b"hello");
        session.add(&["a.txt".into()]).unwrap();

        let id = session.commit_at("initial", 1_700_000_000).unwrap();
        assert_eq!(session.head().unwrap(), Some(id));

        let second = {
            Harness::write_file(&session, "b.txt", b"more");
            session.add(&["b.txt".into()]).unwrap();
            session.commit_at("second", 1_700_000_100).unwrap()
        };
        assert_ne!(second, id);
        assert_eq!(session.head().unwrap(), Some(second));
    }

    #[test]
    fn commit_empty_index_fails() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        let err = session.commit_at("nothing", 1).unwrap_err();
        assert!(matches!(err, SyncError::EmptyIndex));
    }

    #[test]
    fn status_classifies_worktree() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "tracked.txt", b"v1");
        Harness::write_file(&session, "loose.txt", b"untracked");
        session.add(&["tracked.txt".into()]).unwrap();

        // Modify tracked, leave loose untracked.
        Harness::write_file(&session, "tracked.txt", b"v2 longer");

        let status = session.status().unwrap();
        assert_eq!(status.untracked, vec!["loose.txt"]);
        assert_eq!(status.modified, vec!["tracked.txt"]);
        assert!(status.deleted.is_empty());
        assert!(!status.worktree_clean());
    }

    #[test]
    fn status_detects_deleted() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "gone.txt", b"x");
        session.add(&["gone.txt".into()]).unwrap();
        std::fs::remove_file(session.workdir().join("gone.txt")).unwrap();

        let status = session.status().unwrap();
        assert_eq!(status.deleted, vec!["gone.txt"]);
    }

    #[test]
    fn status_touch_without_change_is_clean() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "f.txt", b"stable");
        session.add(&["f.txt".into()]).unwrap();

        // Rewrite identical bytes (mod time moves, content does not).
        Harness::write_file(&session, "f.txt", b"stable");

        let status = session.status().unwrap();
        assert!(status.modified.is_empty());
    }

    #[test]
    fn status_staged_shows_index_vs_head() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "a.txt", b"a");
        session.add(&["a.txt".into()]).unwrap();

        let status = session.status().unwrap();
        assert_eq!(status.staged.len(), 1);
        assert_eq!(status.staged[0].change, ChangeKind::Added);

        session.commit_at("c", 1).unwrap();
        let status = session.status().unwrap();
        assert!(status.staged.is_empty());
    }

    #[test]
    fn state_starts_untracked() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        assert_eq!(session.sync_state().unwrap(), SyncState::Untracked);
    }

    #[test]
    fn log_walks_newest_first() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        Harness::write_file(&session, "f.txt", b"1");
        session.add(&["f.txt".into()]).unwrap();
        session.commit_at("first", 10).unwrap();
        Harness::write_file(&session, "f.txt", b"22");
        session.add(&["f.txt".into()]).unwrap();
        session.commit_at("second", 20).unwrap();

        let log = session.log(10).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "second");
        assert_eq!(log[1].message, "first");
        assert!(log[0].remote_id.is_none());
    }

    #[test]
    fn log_respects_limit() {
        let h = Harness::new();
        let session = h.init_repo("repo");
        for i in 0..3 {
            Harness::write_file(&session, "f.txt", format!("rev{i}").as_bytes());
            session.add(&["f.txt".into()]).unwrap();
            session.commit_at(&format!("c{i}"), i).unwrap();
        }
        assert_eq!(session.log(2).unwrap().len(), 2);
    }
}
