//! Local mutable pointers.
//!
//! Three pieces of mutable state live outside the object stores: `HEAD`
//! (the single branch's current commit), the cached view of the remote
//! pointer (refreshed only by fetch), and the repository configuration.
//! Everything is persisted as canonical JSON.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult};
pub use fs::FsRefStore;
pub use memory::MemoryRefStore;
pub use traits::RefStore;
pub use types::{RemoteHead, RepoConfig};

/// The single branch name. wit tracks exactly one branch.
pub const BRANCH: &str = "main";
