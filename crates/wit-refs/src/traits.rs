use wit_types::CommitId;

use crate::error::RefResult;
use crate::types::{RemoteHead, RepoConfig};

/// Storage backend for the repository's mutable pointers.
///
/// Implementations must be thread-safe (`Send + Sync`). Each pointer has a
/// single writer by construction (operations within one process run
/// sequentially), so atomicity requirements are per-file only.
pub trait RefStore: Send + Sync {
    /// The current local HEAD commit, or `None` before the first commit.
    fn head(&self) -> RefResult<Option<CommitId>>;

    /// Move HEAD. Only commit and checkout do this.
    fn set_head(&self, head: Option<CommitId>) -> RefResult<()>;

    /// The cached remote pointer, or `None` if never fetched/pushed.
    fn remote_head(&self) -> RefResult<Option<RemoteHead>>;

    /// Replace the cached remote pointer. Only fetch and a successful push
    /// do this.
    fn set_remote_head(&self, head: &RemoteHead) -> RefResult<()>;

    /// Repository configuration.
    fn config(&self) -> RefResult<RepoConfig>;

    /// Persist the repository configuration.
    fn set_config(&self, config: &RepoConfig) -> RefResult<()>;
}
