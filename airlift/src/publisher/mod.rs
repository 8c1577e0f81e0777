//! Server-side manifest publishing.
//!
//! Publishing is the producer half of the sync pipeline: walk a content
//! root with the configured filters, stamp the tree with a timestamp and
//! scope, and sign the canonical bytes. The result is a
//! [`crate::manifest::SignedManifest`] ready to be written to the wire
//! by whatever HTTP/CLI layer fronts the engine; the publisher itself
//! exposes no network listener.

mod error;

use std::path::Path;

use tracing::info;

use crate::hasher::TreeHasher;
use crate::manifest::{ContentScope, Manifest, SignedManifest};
use crate::signing::ManifestSigner;

pub use error::{PublishError, PublishResult};

/// Builds and signs manifests for content roots.
pub struct ManifestPublisher {
    signer: ManifestSigner,
    hasher: TreeHasher,
}

impl ManifestPublisher {
    /// Create a publisher hashing every file's full contents.
    pub fn new(signer: ManifestSigner) -> Self {
        Self {
            signer,
            hasher: TreeHasher::new(),
        }
    }

    /// Use a custom hasher (include filter, fast-check policy).
    pub fn with_hasher(mut self, hasher: TreeHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// Build an unsigned manifest for a content root.
    ///
    /// Useful for dry runs and diff tooling; [`publish`](Self::publish)
    /// is the signed path.
    pub fn build(&self, root: &Path, scope: ContentScope) -> PublishResult<Manifest> {
        let tree = self.hasher.hash_tree(root)?;
        Ok(Manifest::new(tree, scope))
    }

    /// Hash a content root and return the signed manifest.
    pub fn publish(&self, root: &Path, scope: ContentScope) -> PublishResult<SignedManifest> {
        let manifest = self.build(root, scope)?;
        let signed = self.signer.sign(&manifest)?;
        info!(
            %scope,
            files = manifest.root.file_count(),
            bytes = manifest.root.total_bytes(),
            "Published manifest"
        );
        Ok(signed)
    }
}

impl std::fmt::Debug for ManifestPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestPublisher")
            .field("signer", &self.signer)
            .field("hasher", &self.hasher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::ManifestVerifier;
    use tempfile::TempDir;

    fn signer() -> ManifestSigner {
        ManifestSigner::from_seed_bytes(&[3u8; 32])
    }

    #[test]
    fn test_publish_produces_verifiable_manifest() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("client.jar"), b"client").unwrap();

        let signer = signer();
        let verifier = ManifestVerifier::new(signer.verifying_key());
        let publisher = ManifestPublisher::new(signer);

        let signed = publisher
            .publish(root.path(), ContentScope::GameClient)
            .unwrap();
        let manifest = verifier.verify(&signed).unwrap();

        assert_eq!(manifest.content_scope, ContentScope::GameClient);
        assert_eq!(manifest.root.file_count(), 1);
    }

    #[test]
    fn test_publish_missing_root_fails() {
        let publisher = ManifestPublisher::new(signer());
        assert!(publisher
            .publish(Path::new("/nonexistent/content"), ContentScope::Runtime)
            .is_err());
    }

    #[test]
    fn test_same_tree_signs_identically_modulo_timestamp() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("a.bin"), b"a").unwrap();

        let publisher = ManifestPublisher::new(signer());
        let first = publisher.build(root.path(), ContentScope::AssetIndex).unwrap();
        let second = publisher.build(root.path(), ContentScope::AssetIndex).unwrap();

        assert_eq!(first.root, second.root);
    }
}
