//! Error types for directory hashing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while hashing a directory tree.
///
/// Unreadable files and subdirectories below the root are *not* errors
/// at this level; the walker logs and omits them. Only conditions that
/// invalidate the whole walk surface here.
#[derive(Debug, Error)]
pub enum HasherError {
    /// The root directory itself could not be read.
    #[error("failed to read content root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An include or fast-check pattern failed to compile.
    #[error("invalid path pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
