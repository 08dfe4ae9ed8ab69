//! Filesystem ref store.
//!
//! Layout under the repository state directory:
//!
//! ```text
//! HEAD          symbolic pointer to the single branch
//! refs/main     the branch file: current commit id or null
//! refs/remote   cached remote pointer (absent until first fetch/push)
//! config        repository configuration
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wit_hash::canonical_bytes;
use wit_types::CommitId;

use crate::error::{RefError, RefResult};
use crate::traits::RefStore;
use crate::types::{RemoteHead, RepoConfig};
use crate::BRANCH;

#[derive(Serialize, Deserialize)]
struct HeadFile {
    r#ref: String,
}

#[derive(Serialize, Deserialize)]
struct BranchFile {
    commit: Option<CommitId>,
}

#[derive(Debug)]
pub struct FsRefStore {
    dir: PathBuf,
}

impl FsRefStore {
    /// Initialize the ref layout in `dir` and write the initial config.
    pub fn init(dir: impl Into<PathBuf>, config: &RepoConfig) -> RefResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join("refs"))?;
        let store = Self { dir };
        store.write_json(
            "HEAD",
            &HeadFile {
                r#ref: format!("refs/{BRANCH}"),
            },
        )?;
        store.write_json(&format!("refs/{BRANCH}"), &BranchFile { commit: None })?;
        store.set_config(config)?;
        Ok(store)
    }

    /// Open an existing ref layout; fails if `dir` was never initialized.
    pub fn open(dir: impl Into<PathBuf>) -> RefResult<Self> {
        let dir = dir.into();
        if !dir.join("HEAD").is_file() {
            return Err(RefError::NotInitialized(dir.display().to_string()));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> RefResult<()> {
        let bytes =
            canonical_bytes(value).map_err(|e| RefError::Serialization(e.to_string()))?;
        fs::write(self.dir.join(name), bytes)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> RefResult<Option<T>> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RefError::Serialization(e.to_string()))
    }

    fn branch_ref(&self) -> RefResult<String> {
        let head: HeadFile = self
            .read_json("HEAD")?
            .ok_or_else(|| RefError::NotInitialized(self.dir.display().to_string()))?;
        Ok(head.r#ref)
    }
}

impl RefStore for FsRefStore {
    fn head(&self) -> RefResult<Option<CommitId>> {
        let branch = self.branch_ref()?;
        let file: Option<BranchFile> = self.read_json(&branch)?;
        Ok(file.and_then(|f| f.commit))
    }

    fn set_head(&self, head: Option<CommitId>) -> RefResult<()> {
        let branch = self.branch_ref()?;
        self.write_json(&branch, &BranchFile { commit: head })
    }

    fn remote_head(&self) -> RefResult<Option<RemoteHead>> {
        self.read_json("refs/remote")
    }

    fn set_remote_head(&self, head: &RemoteHead) -> RefResult<()> {
        self.write_json("refs/remote", head)
    }

    fn config(&self) -> RefResult<RepoConfig> {
        self.read_json("config")?
            .ok_or_else(|| RefError::NotInitialized(self.dir.display().to_string()))
    }

    fn set_config(&self, config: &RepoConfig) -> RefResult<()> {
        self.write_json("config", config)
    }
}
