//! Canonical serialization and content hashing.
//!
//! Everything wit hashes or persists goes through one canonical JSON form:
//! recursively sorted object keys, fixed textual encoding, trailing newline.
//! Key order can therefore never affect an identity.

pub mod canon;
pub mod hasher;

pub use canon::{canonical_bytes, canonical_stringify, canonicalize, CanonError};
pub use hasher::ContentHasher;
