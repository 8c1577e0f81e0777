//! Canonical manifest serialization.
//!
//! Signing and verification are byte-exact, so the manifest needs one
//! reproducible serialized form: JSON with struct fields in declaration
//! order and tree children in sorted (`BTreeMap`) order, timestamps at
//! fixed second precision, no insignificant whitespace. Two manifests
//! describing the same tree always canonicalize to identical bytes.

use super::document::Manifest;
use super::error::ManifestError;

/// Serialize a manifest to its canonical byte form.
pub fn canonical_bytes(manifest: &Manifest) -> Result<Vec<u8>, ManifestError> {
    Ok(serde_json::to_vec(manifest)?)
}

/// Parse a manifest from (presumed canonical) bytes.
///
/// Path validation happens during deserialization; callers that received
/// the bytes from an untrusted source must still confirm canonicality by
/// re-serializing and comparing (the verifier does this).
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, ManifestError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::document::ContentScope;
    use crate::manifest::tree::{ContentEntry, ContentHash, DirEntry, FileEntry, RelativePath};

    fn sample_manifest() -> Manifest {
        let mut root = DirEntry::new(RelativePath::root());
        root.insert(ContentEntry::File(FileEntry {
            relative_path: RelativePath::new("client.jar").unwrap(),
            byte_size: 1024,
            content_hash: ContentHash::new("ab".repeat(32)).unwrap(),
        }));
        let mut libs = DirEntry::new(RelativePath::new("libraries").unwrap());
        libs.insert(ContentEntry::File(FileEntry {
            relative_path: RelativePath::new("libraries/core.jar").unwrap(),
            byte_size: 2048,
            content_hash: ContentHash::new("cd".repeat(32)).unwrap(),
        }));
        root.insert(ContentEntry::Dir(libs));
        Manifest::new(root, ContentScope::GameClient)
    }

    #[test]
    fn test_canonical_bytes_are_deterministic() {
        let manifest = sample_manifest();
        let first = canonical_bytes(&manifest).unwrap();
        let second = canonical_bytes(&manifest).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_canonical_round_trip_is_byte_identical() {
        let manifest = sample_manifest();
        let bytes = canonical_bytes(&manifest).unwrap();
        let parsed = parse_manifest(&bytes).unwrap();
        assert_eq!(canonical_bytes(&parsed).unwrap(), bytes);
    }

    #[test]
    fn test_parse_rejects_traversal_paths() {
        let manifest = sample_manifest();
        let json = String::from_utf8(canonical_bytes(&manifest).unwrap()).unwrap();
        let tampered = json.replace("client.jar", "../client.jar");
        assert!(parse_manifest(tampered.as_bytes()).is_err());
    }

    #[test]
    fn test_wire_field_names() {
        let manifest = sample_manifest();
        let json = String::from_utf8(canonical_bytes(&manifest).unwrap()).unwrap();
        assert!(json.contains("\"generatedAt\""));
        assert!(json.contains("\"contentScope\""));
        assert!(json.contains("\"relativePath\""));
        assert!(json.contains("\"byteSize\""));
        assert!(json.contains("\"contentHash\""));
    }
}
