//! Error types for manifest signing and verification.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;

/// Errors raised at the manifest trust boundary.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The signature did not verify against the manifest payload.
    ///
    /// A manifest that fails with this error must not be passed to any
    /// other component.
    #[error("manifest signature verification failed")]
    SignatureInvalid,

    /// The signature was not a well-formed hex-encoded Ed25519 signature.
    #[error("malformed signature encoding")]
    MalformedSignature,

    /// The payload parsed, but is not in canonical form. Accepting it
    /// would let two different byte strings claim the same signature.
    #[error("manifest payload is not canonical")]
    NotCanonical,

    /// Key material could not be read or had the wrong shape.
    #[error("invalid key material in {path}: {reason}")]
    InvalidKey { path: PathBuf, reason: String },

    /// Key file I/O failed.
    #[error("failed to read key file {path}: {source}")]
    KeyIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest payload could not be parsed or re-serialized.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}
