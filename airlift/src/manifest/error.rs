//! Error types for manifest construction and parsing.

use thiserror::Error;

/// Errors that can occur while building, validating, or (de)serializing
/// a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A relative path contained an absolute prefix, a parent-directory
    /// segment, or another component that could escape the sandbox root.
    #[error("unsafe relative path: {0}")]
    UnsafePath(String),

    /// A content hash was not a 64-character lowercase hex string.
    #[error("malformed content hash: {0}")]
    MalformedHash(String),

    /// A directory entry's children map was inconsistent with the entry
    /// paths it contains (wrong key, wrong parent prefix).
    #[error("inconsistent tree structure at {path}: {reason}")]
    InconsistentTree { path: String, reason: String },

    /// The manifest payload could not be serialized or parsed.
    #[error("manifest encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The signed envelope was structurally invalid.
    #[error("malformed manifest envelope: {0}")]
    MalformedEnvelope(String),

    /// An unknown content scope string was supplied.
    #[error("unknown content scope: {0}")]
    UnknownScope(String),
}
