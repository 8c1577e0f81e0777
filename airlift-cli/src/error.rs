//! CLI error type.

use std::fmt;

use airlift::config::ConfigError;
use airlift::hasher::HasherError;
use airlift::manifest::ManifestError;
use airlift::publisher::PublishError;
use airlift::signing::SignatureError;

/// Errors surfaced to the CLI user.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file problem.
    Config(ConfigError),

    /// A required setting is missing from both flags and config.
    MissingSetting(String),

    /// Key generation or loading failed.
    Key(String),

    /// Reading or writing a file failed.
    Io(String),

    /// Manifest (de)serialization failed.
    Manifest(ManifestError),

    /// Manifest signing or verification failed.
    Signature(SignatureError),

    /// Hashing a directory failed.
    Hasher(HasherError),

    /// Publishing failed.
    Publish(PublishError),

    /// The sync session failed.
    Sync(String),

    /// Failed to create the Tokio runtime.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::MissingSetting(msg) => {
                write!(f, "Missing setting: {}", msg)
            }
            CliError::Key(msg) => write!(f, "Key error: {}", msg),
            CliError::Io(msg) => write!(f, "I/O error: {}", msg),
            CliError::Manifest(e) => write!(f, "Manifest error: {}", e),
            CliError::Signature(e) => write!(f, "Signature error: {}", e),
            CliError::Hasher(e) => write!(f, "Hashing error: {}", e),
            CliError::Publish(e) => write!(f, "Publish error: {}", e),
            CliError::Sync(msg) => write!(f, "Sync error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Manifest(e) => Some(e),
            CliError::Signature(e) => Some(e),
            CliError::Hasher(e) => Some(e),
            CliError::Publish(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        CliError::Manifest(e)
    }
}

impl From<SignatureError> for CliError {
    fn from(e: SignatureError) -> Self {
        CliError::Signature(e)
    }
}

impl From<HasherError> for CliError {
    fn from(e: HasherError) -> Self {
        CliError::Hasher(e)
    }
}

impl From<PublishError> for CliError {
    fn from(e: PublishError) -> Self {
        CliError::Publish(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CliError::MissingSetting("sync.base_url".to_string());
        assert!(err.to_string().contains("sync.base_url"));
    }
}
