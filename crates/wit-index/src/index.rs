//! The index: the persisted path → metadata mapping.

use std::collections::BTreeMap;
use std::path::Path;

use wit_hash::canonical_bytes;
use wit_types::FileMetadata;

use crate::error::{IndexError, IndexResult};

/// The staging area: tracked paths and their metadata snapshots.
///
/// Paths are unique, forward-slash-normalized, and relative to the working
/// tree root. Insertion order is irrelevant; the `BTreeMap` keeps iteration
/// path-sorted, which the root hash and diff rely on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    entries: BTreeMap<String, FileMetadata>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<String, FileMetadata>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&FileMetadata> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Add or update an entry.
    pub fn insert(&mut self, path: impl Into<String>, meta: FileMetadata) -> IndexResult<()> {
        let path = path.into();
        if path.is_empty() {
            return Err(IndexError::InvalidPath("empty path".to_string()));
        }
        self.entries.insert(path, meta);
        Ok(())
    }

    pub fn remove(&mut self, path: &str) -> Option<FileMetadata> {
        self.entries.remove(path)
    }

    /// Path-sorted iteration.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileMetadata)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entries(&self) -> &BTreeMap<String, FileMetadata> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, FileMetadata> {
        self.entries
    }

    /// Load from disk. A missing file is an empty index (a freshly
    /// initialized repository has staged nothing yet).
    pub fn load(path: &Path) -> IndexResult<Self> {
        if !path.is_file() {
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        let entries = serde_json::from_slice(&bytes)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        Ok(Self { entries })
    }

    /// Persist as canonical JSON.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        let bytes = canonical_bytes(&self.entries)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::compute_meta;
    use wit_types::PermissionClass;

    fn meta(content: &[u8]) -> FileMetadata {
        compute_meta(content, PermissionClass::Regular, 100)
    }

    #[test]
    fn new_index_is_empty() {
        let idx = Index::new();
        assert!(idx.is_empty());
        assert_eq!(idx.len(), 0);
    }

    #[test]
    fn insert_and_get() {
        let mut idx = Index::new();
        idx.insert("a.txt", meta(b"aaa")).unwrap();
        assert!(idx.contains("a.txt"));
        assert_eq!(idx.get("a.txt").unwrap().size, 3);
    }

    #[test]
    fn insert_rejects_empty_path() {
        let mut idx = Index::new();
        assert!(matches!(
            idx.insert("", meta(b"x")),
            Err(IndexError::InvalidPath(_))
        ));
    }

    #[test]
    fn insert_replaces_existing() {
        let mut idx = Index::new();
        idx.insert("f", meta(b"old")).unwrap();
        idx.insert("f", meta(b"newer")).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.get("f").unwrap().size, 5);
    }

    #[test]
    fn iteration_is_path_sorted() {
        let mut idx = Index::new();
        idx.insert("zebra", meta(b"z")).unwrap();
        idx.insert("alpha", meta(b"a")).unwrap();
        idx.insert("middle", meta(b"m")).unwrap();
        let paths: Vec<_> = idx.paths().cloned().collect();
        assert_eq!(paths, vec!["alpha", "middle", "zebra"]);
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("index");

        let mut idx = Index::new();
        idx.insert("dir/file.txt", meta(b"content")).unwrap();
        idx.save(&file).unwrap();

        let loaded = Index::load(&file).unwrap();
        assert_eq!(idx, loaded);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let idx = Index::load(&dir.path().join("absent")).unwrap();
        assert!(idx.is_empty());
    }

    #[test]
    fn saved_form_is_canonical() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("index");
        let mut idx = Index::new();
        idx.insert("b", meta(b"b")).unwrap();
        idx.insert("a", meta(b"a")).unwrap();
        idx.save(&file).unwrap();

        let text = std::fs::read_to_string(&file).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
    }
}
