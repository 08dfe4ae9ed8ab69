use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD_NO_PAD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// The hash algorithm tag carried in every textual hash.
///
/// The text form of a hash is `"<algo>-" + base64(digest)`, with a fixed
/// alphabet (standard, no padding) so the encoding is identical on every
/// platform. Changing the algorithm changes the tag, so hashes from
/// different algorithm generations can never be confused.
pub const HASH_ALGO: &str = "blake3";

/// A content-derived identifier: the BLAKE3 digest of some byte stream.
///
/// Identical content always produces the same `ContentHash`, making objects
/// deduplicatable and verifiable. The canonical textual form is
/// `blake3-<base64>`; that text is also the serde representation, so every
/// persisted JSON document carries hashes in one stable shape.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest raw bytes directly, without domain separation.
    ///
    /// Most callers want the domain-tagged hashers in `wit-hash` instead;
    /// this exists for low-level use and tests.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Wrap a pre-computed 32-byte digest.
    pub const fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical text form: `blake3-<base64>`.
    pub fn to_text(&self) -> String {
        format!("{HASH_ALGO}-{}", BASE64_STANDARD_NO_PAD.encode(self.0))
    }

    /// Short form for display (first 4 bytes, hex).
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the canonical text form.
    pub fn from_text(s: &str) -> Result<Self, TypeError> {
        let (algo, encoded) = s
            .split_once('-')
            .ok_or_else(|| TypeError::InvalidHash(s.to_string()))?;
        if algo != HASH_ALGO {
            return Err(TypeError::UnknownAlgorithm(algo.to_string()));
        }
        let bytes = BASE64_STANDARD_NO_PAD
            .decode(encoded)
            .map_err(|e| TypeError::InvalidHash(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes);
        Ok(Self(digest))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_text())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_text(&text).map_err(serde::de::Error::custom)
    }
}

macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(ContentHash);

        impl $name {
            pub const fn new(hash: ContentHash) -> Self {
                Self(hash)
            }

            pub fn as_hash(&self) -> &ContentHash {
                &self.0
            }

            pub fn to_text(&self) -> String {
                self.0.to_text()
            }

            pub fn short(&self) -> String {
                self.0.short()
            }

            pub fn from_text(s: &str) -> Result<Self, TypeError> {
                ContentHash::from_text(s).map(Self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0.short())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<ContentHash> for $name {
            fn from(hash: ContentHash) -> Self {
                Self(hash)
            }
        }
    };
}

hash_newtype! {
    /// Local identity of a commit: the content hash of its canonical
    /// serialization. Any field change yields a different id.
    CommitId
}

hash_newtype! {
    /// The integrity anchor of one complete file-set snapshot: a hash over
    /// the canonical, path-sorted file-metadata tuple list.
    RootHash
}
