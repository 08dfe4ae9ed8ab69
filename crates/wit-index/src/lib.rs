//! Working-tree and index model.
//!
//! The [`Index`] maps forward-slash-normalized relative paths to
//! [`FileMetadata`] snapshots. It is the staging area: grown by add,
//! replaced wholesale by commit and checkout. Walking, diffing, and the
//! root-hash computation all live here because they operate on file sets.

pub mod diff;
pub mod error;
pub mod index;
pub mod meta;
pub mod root;
pub mod walk;

pub use diff::{diff, ChangeKind, DiffEntry};
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use meta::{compute_meta, compute_meta_for_path, normalize_path};
pub use root::{root_hash, root_hash_of};
pub use walk::Walk;
