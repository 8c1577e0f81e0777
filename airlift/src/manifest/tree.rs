//! Content tree data model.
//!
//! A manifest describes a directory tree as a nesting of [`ContentEntry`]
//! values: [`FileEntry`] leaves carrying a size and content hash, and
//! [`DirEntry`] nodes carrying a name-keyed child map. Child maps are
//! `BTreeMap`s so iteration (and therefore canonical serialization) is
//! deterministic; the ordering carries no business meaning.
//!
//! Every entry path is a [`RelativePath`], validated at construction
//! (including during deserialization of untrusted manifests), so a tree
//! that reaches any downstream component can never name a location
//! outside the sandbox root.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::ManifestError;

/// A validated path relative to a sandbox root.
///
/// Segments are separated by `/` regardless of platform. The empty path
/// refers to the root itself and is only ever carried by the root
/// directory entry.
///
/// Construction rejects absolute paths, parent-directory (`..`) and
/// current-directory (`.`) segments, empty segments, backslashes, and NUL
/// bytes. Deserialization goes through the same check, so a manifest
/// parsed from untrusted bytes cannot smuggle a traversal path into the
/// tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a validated relative path from a `/`-separated string.
    pub fn new(raw: impl Into<String>) -> Result<Self, ManifestError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Ok(Self(raw));
        }
        if raw.contains('\\') || raw.contains('\0') {
            return Err(ManifestError::UnsafePath(raw));
        }
        if raw.starts_with('/') {
            return Err(ManifestError::UnsafePath(raw));
        }
        let has_bad_segment = raw
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
        if has_bad_segment {
            return Err(ManifestError::UnsafePath(raw));
        }
        Ok(Self(raw))
    }

    /// The empty path, naming the sandbox root itself.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The path as a `/`-separated string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The final path segment, or `""` for the root.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Append a single segment, validating the result.
    pub fn join(&self, segment: &str) -> Result<Self, ManifestError> {
        if self.0.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}/{}", self.0, segment))
        }
    }

    /// Convert to a native `PathBuf` (platform separators).
    pub fn to_native(&self) -> PathBuf {
        self.0.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Whether `self` is `other` or a descendant of `other`.
    pub fn starts_with(&self, other: &RelativePath) -> bool {
        if other.is_root() {
            return true;
        }
        self.0 == other.0 || self.0.starts_with(&format!("{}/", other.0))
    }
}

impl TryFrom<String> for RelativePath {
    type Error = ManifestError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> String {
        path.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lowercase hex SHA-256 digest.
///
/// Both full content digests and fast-check digests use this form; the
/// two are domain-separated at digest time, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Wrap a digest string, validating shape (64 lowercase hex chars).
    pub fn new(hex_digest: impl Into<String>) -> Result<Self, ManifestError> {
        let hex_digest = hex_digest.into();
        let well_formed = hex_digest.len() == 64
            && hex_digest
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(ManifestError::MalformedHash(hex_digest));
        }
        Ok(Self(hex_digest))
    }

    /// The digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ManifestError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> String {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single file in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the sandbox root.
    pub relative_path: RelativePath,

    /// Size of the file in bytes.
    pub byte_size: u64,

    /// Digest of the file contents (or a fast-check digest, when the
    /// hashing policy excluded this path from full hashing).
    pub content_hash: ContentHash,
}

/// A directory in the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// Path relative to the sandbox root; empty for the root itself.
    pub relative_path: RelativePath,

    /// Children keyed by their final path segment. Sorted iteration keeps
    /// the canonical form stable.
    pub children: BTreeMap<String, ContentEntry>,
}

impl DirEntry {
    /// Create an empty directory entry at `path`.
    pub fn new(path: RelativePath) -> Self {
        Self {
            relative_path: path,
            children: BTreeMap::new(),
        }
    }

    /// Look up a direct child by name.
    pub fn child(&self, name: &str) -> Option<&ContentEntry> {
        self.children.get(name)
    }

    /// Insert a child entry, keyed by its final path segment.
    pub fn insert(&mut self, entry: ContentEntry) {
        self.children
            .insert(entry.relative_path().file_name().to_string(), entry);
    }

    /// Total number of file entries in this subtree.
    pub fn file_count(&self) -> usize {
        self.children
            .values()
            .map(|child| match child {
                ContentEntry::File(_) => 1,
                ContentEntry::Dir(dir) => dir.file_count(),
            })
            .sum()
    }

    /// Total byte size of all files in this subtree.
    pub fn total_bytes(&self) -> u64 {
        self.children
            .values()
            .map(|child| match child {
                ContentEntry::File(file) => file.byte_size,
                ContentEntry::Dir(dir) => dir.total_bytes(),
            })
            .sum()
    }

    /// Validate that every child is keyed by its own file name and that
    /// child paths extend this directory's path by exactly one segment.
    ///
    /// [`RelativePath`] construction already excludes traversal; this
    /// check rejects trees whose *structure* lies about where entries
    /// live, which matters for manifests parsed from untrusted bytes.
    pub fn validate(&self) -> Result<(), ManifestError> {
        for (name, child) in &self.children {
            let child_path = child.relative_path();
            if child_path.file_name() != name {
                return Err(ManifestError::InconsistentTree {
                    path: child_path.to_string(),
                    reason: format!("keyed as {name:?} but named {:?}", child_path.file_name()),
                });
            }
            let expected = self.relative_path.join(name)?;
            if *child_path != expected {
                return Err(ManifestError::InconsistentTree {
                    path: child_path.to_string(),
                    reason: format!("expected path {expected}"),
                });
            }
            if let ContentEntry::Dir(dir) = child {
                dir.validate()?;
            }
        }
        Ok(())
    }
}

/// A node in the content tree: either a file leaf or a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ContentEntry {
    /// A file with a size and content digest.
    File(FileEntry),

    /// A directory with named children.
    Dir(DirEntry),
}

impl ContentEntry {
    /// The entry's path relative to the sandbox root.
    pub fn relative_path(&self) -> &RelativePath {
        match self {
            ContentEntry::File(file) => &file.relative_path,
            ContentEntry::Dir(dir) => &dir.relative_path,
        }
    }

    /// The file entry, if this is a file.
    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            ContentEntry::File(file) => Some(file),
            ContentEntry::Dir(_) => None,
        }
    }

    /// The directory entry, if this is a directory.
    pub fn as_dir(&self) -> Option<&DirEntry> {
        match self {
            ContentEntry::File(_) => None,
            ContentEntry::Dir(dir) => Some(dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_accepts_nested() {
        let path = RelativePath::new("libraries/net/core.jar").unwrap();
        assert_eq!(path.as_str(), "libraries/net/core.jar");
        assert_eq!(path.file_name(), "core.jar");
    }

    #[test]
    fn test_relative_path_rejects_parent_segments() {
        assert!(RelativePath::new("../escape").is_err());
        assert!(RelativePath::new("a/../b").is_err());
        assert!(RelativePath::new("a/..").is_err());
    }

    #[test]
    fn test_relative_path_rejects_absolute() {
        assert!(RelativePath::new("/etc/passwd").is_err());
    }

    #[test]
    fn test_relative_path_rejects_oddities() {
        assert!(RelativePath::new("a//b").is_err());
        assert!(RelativePath::new("./a").is_err());
        assert!(RelativePath::new("a\\b").is_err());
        assert!(RelativePath::new("a\0b").is_err());
    }

    #[test]
    fn test_relative_path_root() {
        let root = RelativePath::root();
        assert!(root.is_root());
        assert_eq!(root.join("config").unwrap().as_str(), "config");
    }

    #[test]
    fn test_relative_path_rejected_during_deserialization() {
        let result: Result<RelativePath, _> = serde_json::from_str("\"../../boom\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_path_starts_with() {
        let parent = RelativePath::new("mods").unwrap();
        let child = RelativePath::new("mods/extra.jar").unwrap();
        let sibling = RelativePath::new("modsarchive").unwrap();
        assert!(child.starts_with(&parent));
        assert!(!sibling.starts_with(&parent));
        assert!(child.starts_with(&RelativePath::root()));
    }

    #[test]
    fn test_content_hash_shape() {
        let good = "a".repeat(64);
        assert!(ContentHash::new(good).is_ok());
        assert!(ContentHash::new("ABCD").is_err());
        assert!(ContentHash::new("g".repeat(64)).is_err());
    }

    #[test]
    fn test_dir_entry_validate_detects_mismatched_key() {
        let mut root = DirEntry::new(RelativePath::root());
        root.children.insert(
            "renamed".to_string(),
            ContentEntry::File(FileEntry {
                relative_path: RelativePath::new("original").unwrap(),
                byte_size: 1,
                content_hash: ContentHash::new("0".repeat(64)).unwrap(),
            }),
        );
        assert!(root.validate().is_err());
    }

    #[test]
    fn test_dir_entry_validate_detects_foreign_parent() {
        let mut root = DirEntry::new(RelativePath::root());
        root.children.insert(
            "stray".to_string(),
            ContentEntry::File(FileEntry {
                relative_path: RelativePath::new("elsewhere/stray").unwrap(),
                byte_size: 1,
                content_hash: ContentHash::new("0".repeat(64)).unwrap(),
            }),
        );
        assert!(root.validate().is_err());
    }

    #[test]
    fn test_dir_entry_counters() {
        let mut sub = DirEntry::new(RelativePath::new("assets").unwrap());
        sub.insert(ContentEntry::File(FileEntry {
            relative_path: RelativePath::new("assets/a.png").unwrap(),
            byte_size: 10,
            content_hash: ContentHash::new("0".repeat(64)).unwrap(),
        }));
        let mut root = DirEntry::new(RelativePath::root());
        root.insert(ContentEntry::Dir(sub));
        root.insert(ContentEntry::File(FileEntry {
            relative_path: RelativePath::new("client.jar").unwrap(),
            byte_size: 32,
            content_hash: ContentHash::new("1".repeat(64)).unwrap(),
        }));

        assert_eq!(root.file_count(), 2);
        assert_eq!(root.total_bytes(), 42);
        root.validate().unwrap();
    }
}
