//! Metadata snapshot computation.

use std::path::Path;
use std::time::UNIX_EPOCH;

use wit_hash::ContentHasher;
use wit_types::{FileMetadata, PermissionClass};

use crate::error::{IndexError, IndexResult};

/// Compute a metadata snapshot from file bytes and permission bits.
///
/// Pure: the same bytes, permission class, and mod time always produce the
/// same snapshot.
pub fn compute_meta(
    bytes: &[u8],
    permission_class: PermissionClass,
    mod_time: u64,
) -> FileMetadata {
    FileMetadata {
        content_hash: ContentHasher::BLOB.hash(bytes),
        size: bytes.len() as u64,
        permission_class,
        mod_time,
        encryption: None,
    }
}

/// Stat and hash a file on disk.
pub fn compute_meta_for_path(path: &Path) -> IndexResult<(FileMetadata, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    let stat = std::fs::metadata(path)?;
    let mod_time = stat
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let permission_class = permission_class_of(&stat);
    Ok((compute_meta(&bytes, permission_class, mod_time), bytes))
}

#[cfg(unix)]
fn permission_class_of(stat: &std::fs::Metadata) -> PermissionClass {
    use std::os::unix::fs::PermissionsExt;
    PermissionClass::from_mode_bits(stat.permissions().mode())
}

#[cfg(not(unix))]
fn permission_class_of(_stat: &std::fs::Metadata) -> PermissionClass {
    PermissionClass::Regular
}

/// Normalize a relative path to the forward-slash form used as index keys.
///
/// Rejects absolute paths and parent-directory escapes.
pub fn normalize_path(path: &Path) -> IndexResult<String> {
    use std::path::Component;

    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| IndexError::InvalidPath(path.display().to_string()))?,
            ),
            Component::CurDir => {}
            _ => return Err(IndexError::InvalidPath(path.display().to_string())),
        }
    }
    if parts.is_empty() {
        return Err(IndexError::InvalidPath(path.display().to_string()));
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn compute_meta_is_deterministic() {
        let a = compute_meta(b"hello", PermissionClass::Regular, 100);
        let b = compute_meta(b"hello", PermissionClass::Regular, 100);
        assert_eq!(a, b);
        assert_eq!(a.size, 5);
    }

    #[test]
    fn compute_meta_hash_tracks_content() {
        let a = compute_meta(b"aaa", PermissionClass::Regular, 1);
        let b = compute_meta(b"bbb", PermissionClass::Regular, 1);
        assert_ne!(a.content_hash, b.content_hash);
    }

    #[test]
    fn normalize_forward_slashes() {
        let p = PathBuf::from("dir").join("sub").join("file.txt");
        assert_eq!(normalize_path(&p).unwrap(), "dir/sub/file.txt");
    }

    #[test]
    fn normalize_strips_curdir() {
        assert_eq!(normalize_path(Path::new("./a/b")).unwrap(), "a/b");
    }

    #[test]
    fn normalize_rejects_parent_escape() {
        assert!(matches!(
            normalize_path(Path::new("../escape")),
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[test]
    fn normalize_rejects_absolute() {
        assert!(matches!(
            normalize_path(Path::new("/abs/path")),
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[test]
    fn compute_meta_for_path_reads_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("data.txt");
        std::fs::write(&file, b"on disk").unwrap();
        let (meta, bytes) = compute_meta_for_path(&file).unwrap();
        assert_eq!(bytes, b"on disk");
        assert_eq!(meta.size, 7);
        assert!(meta.mod_time > 0);
    }
}
