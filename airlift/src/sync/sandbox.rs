//! Sandbox path resolution.

use std::path::{Component, Path, PathBuf};

use crate::manifest::RelativePath;

use super::error::{SyncError, SyncResult};

/// Extension appended to a destination while its bytes are streaming.
const STAGING_SUFFIX: &str = ".part";

/// The single directory boundary a session may write within.
///
/// The root is supplied by the caller per content scope; the engine
/// never chooses or creates it. [`Sandbox::resolve`] is the last line of
/// defense before a filesystem write: even though every
/// [`RelativePath`] was validated at construction, the resolved path is
/// re-checked lexically here and fails closed with
/// [`SyncError::PathEscape`].
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox over an absolute root path.
    pub fn new(root: impl Into<PathBuf>) -> SyncResult<Self> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(SyncError::SandboxUnavailable { path: root });
        }
        Ok(Self { root })
    }

    /// The sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the root currently exists and is a directory.
    pub fn ensure_available(&self) -> SyncResult<()> {
        match std::fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            _ => Err(SyncError::SandboxUnavailable {
                path: self.root.clone(),
            }),
        }
    }

    /// Resolve a relative path to an absolute destination inside the
    /// root, re-validating containment.
    pub fn resolve(&self, rel: &RelativePath) -> SyncResult<PathBuf> {
        let native = rel.to_native();
        for component in native.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(SyncError::PathEscape {
                        path: rel.to_string(),
                    })
                }
            }
        }
        let resolved = self.root.join(&native);
        if !resolved.starts_with(&self.root) {
            return Err(SyncError::PathEscape {
                path: rel.to_string(),
            });
        }
        Ok(resolved)
    }

    /// The staging (temporary) path for a destination: the final path
    /// with `.part` appended. Lives in the same directory so the final
    /// rename is atomic.
    pub fn staging_path(&self, rel: &RelativePath) -> SyncResult<PathBuf> {
        let resolved = self.resolve(rel)?;
        let mut staging = resolved.into_os_string();
        staging.push(STAGING_SUFFIX);
        Ok(PathBuf::from(staging))
    }
}
