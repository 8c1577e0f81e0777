//! Server-side manifest signing.

use std::fmt;
use std::fs;
use std::path::Path;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH};

use crate::manifest::{canonical_bytes, Manifest, SignedManifest};

use super::error::SignatureError;

/// Signs canonical manifest bytes with an Ed25519 private key.
///
/// This is a server-only capability: clients never hold the signing key.
/// Key material is loaded once at startup and kept only inside the
/// wrapped [`SigningKey`]; the type deliberately implements a redacted
/// `Debug` so the seed can never leak through logging.
pub struct ManifestSigner {
    key: SigningKey,
}

impl ManifestSigner {
    /// Create a signer from a raw 32-byte seed.
    pub fn from_seed_bytes(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a signer from a file containing exactly the 32-byte seed.
    pub fn from_seed_file(path: &Path) -> Result<Self, SignatureError> {
        let bytes = fs::read(path).map_err(|source| SignatureError::KeyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: [u8; SECRET_KEY_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| SignatureError::InvalidKey {
                    path: path.to_path_buf(),
                    reason: format!("expected {SECRET_KEY_LENGTH} bytes, found {}", bytes.len()),
                })?;
        Ok(Self::from_seed_bytes(&seed))
    }

    /// The public half of the signing key.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Canonicalize and sign a manifest.
    pub fn sign(&self, manifest: &Manifest) -> Result<SignedManifest, SignatureError> {
        let manifest_bytes = canonical_bytes(manifest)?;
        let signature = self.key.sign(&manifest_bytes);
        Ok(SignedManifest {
            manifest_bytes,
            signature: hex::encode(signature.to_bytes()),
        })
    }
}

impl fmt::Debug for ManifestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestSigner")
            .field("key", &"<redacted>")
            .finish()
    }
}
