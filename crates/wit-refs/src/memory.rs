use std::sync::RwLock;

use wit_types::CommitId;

use crate::error::RefResult;
use crate::traits::RefStore;
use crate::types::{RemoteHead, RepoConfig};

/// In-memory ref store for tests and embedding.
pub struct MemoryRefStore {
    head: RwLock<Option<CommitId>>,
    remote: RwLock<Option<RemoteHead>>,
    config: RwLock<RepoConfig>,
}

impl MemoryRefStore {
    pub fn new(config: RepoConfig) -> Self {
        Self {
            head: RwLock::new(None),
            remote: RwLock::new(None),
            config: RwLock::new(config),
        }
    }
}

impl RefStore for MemoryRefStore {
    fn head(&self) -> RefResult<Option<CommitId>> {
        Ok(*self.head.read().expect("lock poisoned"))
    }

    fn set_head(&self, head: Option<CommitId>) -> RefResult<()> {
        *self.head.write().expect("lock poisoned") = head;
        Ok(())
    }

    fn remote_head(&self) -> RefResult<Option<RemoteHead>> {
        Ok(self.remote.read().expect("lock poisoned").clone())
    }

    fn set_remote_head(&self, head: &RemoteHead) -> RefResult<()> {
        *self.remote.write().expect("lock poisoned") = Some(head.clone());
        Ok(())
    }

    fn config(&self) -> RefResult<RepoConfig> {
        Ok(self.config.read().expect("lock poisoned").clone())
    }

    fn set_config(&self, config: &RepoConfig) -> RefResult<()> {
        *self.config.write().expect("lock poisoned") = config.clone();
        Ok(())
    }
}
