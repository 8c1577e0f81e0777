//! Client-side manifest verification.

use std::fs;
use std::path::Path;

use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use tracing::warn;

use crate::manifest::{canonical_bytes, parse_manifest, Manifest, SignedManifest};

use super::error::SignatureError;

/// Verifies a [`SignedManifest`] against a pinned public key.
///
/// The update channel is not assumed integrity-protected, so this
/// signature is the client's only trust anchor. Order matters and is
/// fixed: the outer signature is checked over the raw payload bytes
/// *before* the inner structure is parsed or any path is looked at, and
/// nothing downstream ever sees a manifest that failed here.
#[derive(Debug, Clone)]
pub struct ManifestVerifier {
    key: VerifyingKey,
}

impl ManifestVerifier {
    /// Create a verifier for a known public key.
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Create a verifier from raw public key bytes.
    pub fn from_public_key_bytes(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, SignatureError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|e| SignatureError::InvalidKey {
            path: Path::new("<inline>").to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(key))
    }

    /// Load a verifier from a file containing the 32-byte public key.
    pub fn from_public_key_file(path: &Path) -> Result<Self, SignatureError> {
        let bytes = fs::read(path).map_err(|source| SignatureError::KeyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let key_bytes: [u8; PUBLIC_KEY_LENGTH] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| SignatureError::InvalidKey {
                    path: path.to_path_buf(),
                    reason: format!("expected {PUBLIC_KEY_LENGTH} bytes, found {}", bytes.len()),
                })?;
        Self::from_public_key_bytes(&key_bytes)
    }

    /// Verify a signed manifest and return the trusted [`Manifest`].
    ///
    /// Checks, in order: signature over the exact payload bytes
    /// (`verify_strict`, constant-time), payload parse (which validates
    /// every path at construction), canonical-form byte equality, and
    /// tree-shape consistency. Any failure means the manifest must be
    /// discarded.
    pub fn verify(&self, signed: &SignedManifest) -> Result<Manifest, SignatureError> {
        let signature_bytes =
            hex::decode(&signed.signature).map_err(|_| SignatureError::MalformedSignature)?;
        let signature_bytes: [u8; SIGNATURE_LENGTH] = signature_bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignatureError::MalformedSignature)?;
        let signature = Signature::from_bytes(&signature_bytes);

        if self
            .key
            .verify_strict(&signed.manifest_bytes, &signature)
            .is_err()
        {
            warn!("Rejected manifest with invalid signature");
            return Err(SignatureError::SignatureInvalid);
        }

        let manifest = parse_manifest(&signed.manifest_bytes)?;

        if canonical_bytes(&manifest)? != signed.manifest_bytes {
            warn!("Rejected manifest with non-canonical payload");
            return Err(SignatureError::NotCanonical);
        }

        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{
        ContentEntry, ContentHash, ContentScope, DirEntry, FileEntry, RelativePath,
    };
    use crate::signing::signer::ManifestSigner;

    fn signer() -> ManifestSigner {
        ManifestSigner::from_seed_bytes(&[42u8; 32])
    }

    fn sample_manifest() -> Manifest {
        let mut root = DirEntry::new(RelativePath::root());
        root.insert(ContentEntry::File(FileEntry {
            relative_path: RelativePath::new("client.jar").unwrap(),
            byte_size: 16,
            content_hash: ContentHash::new("ef".repeat(32)).unwrap(),
        }));
        Manifest::new(root, ContentScope::GameClient)
    }

    #[test]
    fn test_verify_accepts_signed_manifest() {
        let signer = signer();
        let manifest = sample_manifest();
        let signed = signer.sign(&manifest).unwrap();

        let verifier = ManifestVerifier::new(signer.verifying_key());
        let verified = verifier.verify(&signed).unwrap();
        assert_eq!(verified, manifest);
    }

    #[test]
    fn test_verify_rejects_flipped_payload_bit() {
        let signer = signer();
        let signed = signer.sign(&sample_manifest()).unwrap();
        let verifier = ManifestVerifier::new(signer.verifying_key());

        for index in 0..signed.manifest_bytes.len() {
            let mut tampered = signed.clone();
            tampered.manifest_bytes[index] ^= 0x01;
            assert!(
                verifier.verify(&tampered).is_err(),
                "bit flip at byte {index} was accepted"
            );
        }
    }

    #[test]
    fn test_verify_rejects_tampered_signature() {
        let signer = signer();
        let signed = signer.sign(&sample_manifest()).unwrap();
        let verifier = ManifestVerifier::new(signer.verifying_key());

        let mut tampered = signed.clone();
        let flipped = if tampered.signature.as_bytes()[0] == b'0' {
            "1"
        } else {
            "0"
        };
        tampered.signature.replace_range(0..1, flipped);
        assert!(matches!(
            verifier.verify(&tampered),
            Err(SignatureError::SignatureInvalid) | Err(SignatureError::MalformedSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signed = signer().sign(&sample_manifest()).unwrap();
        let other = ManifestSigner::from_seed_bytes(&[9u8; 32]);
        let verifier = ManifestVerifier::new(other.verifying_key());
        assert!(matches!(
            verifier.verify(&signed),
            Err(SignatureError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_verify_rejects_non_canonical_payload() {
        let signer = signer();
        let manifest = sample_manifest();
        let canonical = canonical_bytes(&manifest).unwrap();

        // Same JSON value, different bytes: inject a space. Sign the
        // non-canonical bytes so the signature itself passes.
        let mut padded = canonical.clone();
        padded.insert(1, b' ');
        use ed25519_dalek::Signer as _;
        let key = ed25519_dalek::SigningKey::from_bytes(&[42u8; 32]);
        let signed = SignedManifest {
            signature: hex::encode(key.sign(&padded).to_bytes()),
            manifest_bytes: padded,
        };

        let verifier = ManifestVerifier::new(signer.verifying_key());
        assert!(matches!(
            verifier.verify(&signed),
            Err(SignatureError::NotCanonical)
        ));
    }

    #[test]
    fn test_verify_rejects_malformed_signature_hex() {
        let signer = signer();
        let mut signed = signer.sign(&sample_manifest()).unwrap();
        signed.signature = "zz".repeat(64);
        let verifier = ManifestVerifier::new(signer.verifying_key());
        assert!(matches!(
            verifier.verify(&signed),
            Err(SignatureError::MalformedSignature)
        ));
    }
}
