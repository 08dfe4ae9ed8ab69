//! Per-file metadata and the identifiers assigned by remote storage.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Identifier assigned by remote content storage when an object is uploaded.
///
/// Unlike [`ContentHash`], remote ids are opaque: the storage network mints
/// them and they carry no derivable structure. They are immutable once
/// minted.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for display.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Debug for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteId({})", self.0)
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a repository in the remote ledger.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepoId(String);

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoId({})", self.0)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Filesystem permission bits collapsed to the two classes the data model
/// distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionClass {
    /// Normal file (0o644).
    Regular,
    /// Executable file (0o755).
    Executable,
}

impl PermissionClass {
    /// Collapse raw unix mode bits: any owner-execute bit means executable.
    pub fn from_mode_bits(mode: u32) -> Self {
        if mode & 0o100 != 0 {
            Self::Executable
        } else {
            Self::Regular
        }
    }

    /// Mode bits to restore on checkout.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o644,
            Self::Executable => 0o755,
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Executable)
    }
}

/// Envelope for a file encrypted at push time.
///
/// The data-encryption key is sealed by the external policy service; only a
/// reader that satisfies the policy can unseal it. The nonce and detached
/// authentication tag are what local decryption needs alongside the key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    #[serde(with = "base64_bytes")]
    pub sealed_key: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub auth_tag: Vec<u8>,
    pub policy_id: String,
}

/// Snapshot of one tracked file's identity and shape.
///
/// Immutable once computed from a byte stream and permission bits; staging a
/// file again recomputes it. `content_hash` is always the hash of the
/// plaintext bytes, even for files that are uploaded encrypted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub content_hash: ContentHash,
    pub size: u64,
    pub permission_class: PermissionClass,
    /// Modification time in whole seconds since the unix epoch.
    pub mod_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionEnvelope>,
}

impl FileMetadata {
    /// Content equality for diff classification.
    ///
    /// `mod_time` is deliberately excluded: a touch without a content change
    /// is not "modified". (It still participates in the root hash.)
    pub fn same_content(&self, other: &FileMetadata) -> bool {
        self.content_hash == other.content_hash
            && self.size == other.size
            && self.permission_class == other.permission_class
    }

    /// Copy of this metadata without the encryption envelope.
    ///
    /// Envelopes belong to manifest entries; commit and index metadata are
    /// stored bare so local commit ids stay stable across push and clone.
    pub fn without_encryption(&self) -> FileMetadata {
        FileMetadata {
            encryption: None,
            ..self.clone()
        }
    }
}

/// Serde adapter storing byte strings as base64 text (fixed alphabet,
/// no padding) instead of JSON number arrays.
pub mod base64_bytes {
    use base64::prelude::{Engine as _, BASE64_STANDARD_NO_PAD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        BASE64_STANDARD_NO_PAD
            .decode(text)
            .map_err(serde::de::Error::custom)
    }
}
