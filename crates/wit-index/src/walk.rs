//! Working-tree traversal.
//!
//! [`Walk`] yields tracked-or-unignored file paths as a lazy, finite,
//! non-restartable sequence. The traversal is an explicit queue (no
//! callback recursion), so stack depth is bounded on arbitrarily deep
//! trees. Tracked paths override ignore rules: a path already in the index
//! is never excluded, and directories containing tracked files are always
//! descended into.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::meta::normalize_path;

/// Name of the repository state directory; never walked.
pub const STATE_DIR: &str = ".wit";

/// Name of a directory-backed remote colocated with the working tree;
/// never walked either.
pub const LOCAL_REMOTE_DIR: &str = ".wit-remote";

/// Name of the ignore-rules file at the working-tree root.
pub const IGNORE_FILE: &str = ".witignore";

pub struct Walk {
    root: PathBuf,
    dirs: VecDeque<PathBuf>,
    files: VecDeque<String>,
    matcher: Option<Gitignore>,
    tracked: HashSet<String>,
    tracked_dirs: HashSet<String>,
}

impl Walk {
    /// Start a walk at `root`, loading ignore rules from `.witignore` there
    /// (if present) and treating `tracked` paths as always included.
    pub fn new<I, S>(root: impl Into<PathBuf>, tracked: I) -> IndexResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = root.into();

        let ignore_file = root.join(IGNORE_FILE);
        let matcher = if ignore_file.is_file() {
            let mut builder = GitignoreBuilder::new(&root);
            if let Some(err) = builder.add(&ignore_file) {
                return Err(IndexError::IgnoreRules(err.to_string()));
            }
            Some(
                builder
                    .build()
                    .map_err(|e| IndexError::IgnoreRules(e.to_string()))?,
            )
        } else {
            None
        };

        let tracked: HashSet<String> = tracked.into_iter().map(Into::into).collect();
        let mut tracked_dirs = HashSet::new();
        for path in &tracked {
            let mut rest = path.as_str();
            while let Some(pos) = rest.rfind('/') {
                rest = &rest[..pos];
                tracked_dirs.insert(rest.to_string());
            }
        }
        debug!(tracked = tracked.len(), "starting working-tree walk");

        let mut dirs = VecDeque::new();
        dirs.push_back(root.clone());
        Ok(Self {
            root,
            dirs,
            files: VecDeque::new(),
            matcher,
            tracked,
            tracked_dirs,
        })
    }

    fn is_ignored(&self, rel: &str, is_dir: bool) -> bool {
        match &self.matcher {
            // Parent matching matters here: a file inside an ignored
            // directory can still be reached when a tracked sibling forces
            // the directory to be descended.
            Some(m) => m
                .matched_path_or_any_parents(Path::new(rel), is_dir)
                .is_ignore(),
            None => false,
        }
    }

    /// Visit one directory, queueing its subdirectories and yieldable files.
    fn visit_dir(&mut self, dir: &Path) -> IndexResult<()> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        entries.sort();

        for path in entries {
            let rel = normalize_path(path.strip_prefix(&self.root).map_err(|_| {
                IndexError::InvalidPath(path.display().to_string())
            })?)?;

            if path.is_dir() {
                if rel == STATE_DIR || rel == LOCAL_REMOTE_DIR {
                    continue;
                }
                // Ancestors of tracked files are always descended into.
                if self.tracked_dirs.contains(&rel) || !self.is_ignored(&rel, true) {
                    self.dirs.push_back(path);
                }
            } else if self.tracked.contains(&rel) || !self.is_ignored(&rel, false) {
                self.files.push_back(rel);
            }
        }
        Ok(())
    }
}

impl Iterator for Walk {
    type Item = IndexResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.files.pop_front() {
                return Some(Ok(file));
            }
            let dir = self.dirs.pop_front()?;
            if let Err(e) = self.visit_dir(&dir) {
                return Some(Err(e));
            }
        }
    }
}
