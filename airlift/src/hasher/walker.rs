//! Directory walking and tree construction.

use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::manifest::{ContentEntry, ContentHash, DirEntry, FileEntry, RelativePath};

use super::digest::digest_file;
use super::error::HasherError;
use super::filter::{HashPolicy, PathFilter};

/// Deterministic mapping from a directory subtree to a [`DirEntry`].
///
/// Two byte-identical trees always hash to identical entries: children
/// are collected into sorted maps and every digest is a pure function of
/// file contents (or size, for fast-check paths). The walker never
/// writes.
///
/// Unreadable files and subdirectories are logged and omitted rather
/// than failing the walk; only an unreadable root is fatal. Symlinks are
/// skipped: a manifest must describe real content inside the root, not
/// aliases that may point out of it.
#[derive(Debug, Clone, Default)]
pub struct TreeHasher {
    include: PathFilter,
    policy: HashPolicy,
}

impl TreeHasher {
    /// Create a hasher that includes every file and hashes full contents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inclusion filter.
    pub fn with_include(mut self, include: PathFilter) -> Self {
        self.include = include;
        self
    }

    /// Set the hashing policy.
    pub fn with_policy(mut self, policy: HashPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The hashing policy in effect.
    pub fn policy(&self) -> &HashPolicy {
        &self.policy
    }

    /// Hash the subtree rooted at `root` into a [`DirEntry`].
    pub fn hash_tree(&self, root: &Path) -> Result<DirEntry, HasherError> {
        self.hash_dir(root, RelativePath::root())
            .map_err(|source| HasherError::RootUnreadable {
                path: root.to_path_buf(),
                source,
            })
    }

    fn hash_dir(&self, dir: &Path, rel: RelativePath) -> io::Result<DirEntry> {
        let mut entry = DirEntry::new(rel.clone());

        for item in fs::read_dir(dir)? {
            let item = match item {
                Ok(item) => item,
                Err(error) => {
                    warn!(dir = %dir.display(), %error, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let name_os = item.file_name();
            let Some(name) = name_os.to_str() else {
                warn!(dir = %dir.display(), "Skipping entry with non-UTF-8 name");
                continue;
            };

            let child_rel = match rel.join(name) {
                Ok(child_rel) => child_rel,
                Err(error) => {
                    warn!(dir = %dir.display(), name, %error, "Skipping entry with unsafe name");
                    continue;
                }
            };

            let file_type = match item.file_type() {
                Ok(file_type) => file_type,
                Err(error) => {
                    warn!(path = %child_rel, %error, "Skipping entry with unreadable type");
                    continue;
                }
            };

            if file_type.is_symlink() {
                warn!(path = %child_rel, "Skipping symlink");
                continue;
            }

            if file_type.is_dir() {
                match self.hash_dir(&item.path(), child_rel.clone()) {
                    Ok(subtree) => entry.insert(ContentEntry::Dir(subtree)),
                    Err(error) => {
                        warn!(path = %child_rel, %error, "Skipping unreadable subdirectory");
                    }
                }
            } else if file_type.is_file() {
                if !self.include.matches(&child_rel) {
                    continue;
                }
                match self.hash_entry(&item.path(), child_rel.clone()) {
                    Ok(file) => entry.insert(ContentEntry::File(file)),
                    Err(error) => {
                        warn!(path = %child_rel, %error, "Skipping unreadable file");
                    }
                }
            }
        }

        Ok(entry)
    }

    fn hash_entry(&self, path: &Path, rel: RelativePath) -> io::Result<FileEntry> {
        let byte_size = fs::metadata(path)?.len();
        let mode = self.policy.mode_for(&rel);
        let digest = digest_file(path, mode)?;
        let content_hash = ContentHash::new(digest)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "malformed digest"))?;
        Ok(FileEntry {
            relative_path: rel,
            byte_size,
            content_hash,
        })
    }
}
