//! Error types for the publisher module.

use thiserror::Error;

use crate::hasher::HasherError;
use crate::signing::SignatureError;

/// Result type for publisher operations.
pub type PublishResult<T> = Result<T, PublishError>;

/// Errors that can occur while publishing a manifest.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Hashing the content root failed.
    #[error(transparent)]
    Hash(#[from] HasherError),

    /// Signing the manifest failed.
    #[error(transparent)]
    Sign(#[from] SignatureError),
}
