use serde::{Deserialize, Serialize};
use wit_types::{RemoteId, RepoId};

/// Last-observed state of the remote pointer.
///
/// Only fetch (and a successful push) update this; it is a cache, never the
/// authority. The `version` is the optimistic-concurrency token the next
/// push will present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHead {
    pub commit: RemoteId,
    pub manifest: RemoteId,
    pub batch: RemoteId,
    pub version: u64,
}

/// Repository configuration.
///
/// `repo_id` is absent until the repository has been created in the remote
/// ledger (the Untracked state); it is written exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub repo_name: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_id: Option<RepoId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl RepoConfig {
    pub fn new(repo_name: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            author: author.into(),
            repo_id: None,
            policy_id: None,
        }
    }
}
