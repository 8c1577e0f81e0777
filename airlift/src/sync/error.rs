//! Error types for the download orchestrator.

use std::io;
use std::path::PathBuf;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while executing a sync plan.
///
/// Most variants are per-file: they land in the session's failure set
/// and the session keeps going. Only an unavailable sandbox root
/// invalidates the plan itself; signature failures never reach this
/// module because verification happens before a plan exists.
#[derive(Debug)]
pub enum SyncError {
    /// Filesystem operation failed.
    Io { path: PathBuf, source: io::Error },

    /// The sandbox root is missing or not a directory. Fatal for the
    /// whole session.
    SandboxUnavailable { path: PathBuf },

    /// A resolved destination escaped the sandbox root. Fails the entry
    /// closed; logged as security-relevant.
    PathEscape { path: String },

    /// The downloaded bytes did not match the manifest's digest after
    /// the bounded retries.
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// The transport failed to deliver the file.
    DownloadFailed { url: String, reason: String },

    /// The session was cancelled. A normal terminal state, not a
    /// failure; files interrupted by cancellation are not recorded as
    /// failed.
    Cancelled,
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "I/O error at {}: {}", path.display(), source)
            }
            Self::SandboxUnavailable { path } => {
                write!(f, "sandbox root {} is not available", path.display())
            }
            Self::PathEscape { path } => {
                write!(f, "path {path:?} escapes the sandbox root")
            }
            Self::HashMismatch {
                path,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "hash mismatch for {path}: expected {expected}, got {actual}"
                )
            }
            Self::DownloadFailed { url, reason } => {
                write!(f, "failed to download {url}: {reason}")
            }
            Self::Cancelled => write!(f, "session cancelled"),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors surfaced by a [`super::FileFetcher`] implementation.
#[derive(Debug)]
pub enum FetchError {
    /// The transport failed (connection, status, read).
    Http { url: String, reason: String },

    /// Writing the fetched bytes failed.
    Io { path: PathBuf, source: io::Error },

    /// The fetch observed its cancellation token.
    Cancelled,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { url, reason } => write!(f, "fetch of {url} failed: {reason}"),
            Self::Io { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::Cancelled => write!(f, "fetch cancelled"),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<FetchError> for SyncError {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Http { url, reason } => SyncError::DownloadFailed { url, reason },
            FetchError::Io { path, source } => SyncError::Io { path, source },
            FetchError::Cancelled => SyncError::Cancelled,
        }
    }
}
