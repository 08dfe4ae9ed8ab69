//! Repository sync-state classification.

/// Where a repository stands relative to its remote.
///
/// `Untracked → Tracked → Ahead | Synced | Diverged`; classification uses
/// only local state (config, identity map, cached remote pointer), so it is
/// as fresh as the last fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    /// No remote repository id assigned yet.
    #[default]
    Untracked,
    /// Remote id known, but no local commits to compare.
    Tracked,
    /// Local HEAD is not mapped to the cached remote head.
    Ahead,
    /// Local HEAD maps to the cached remote head.
    Synced,
    /// The cached remote head is not reachable from local history.
    Diverged,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Untracked => write!(f, "untracked"),
            Self::Tracked => write!(f, "tracked"),
            Self::Ahead => write!(f, "ahead"),
            Self::Synced => write!(f, "synced"),
            Self::Diverged => write!(f, "diverged"),
        }
    }
}
