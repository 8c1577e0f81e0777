//! SHA-256 digests for files and fast-check placeholders.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::filter::HashMode;

/// Buffer size for reading files during digest calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Domain separator for fast-check digests.
///
/// Guarantees a size-only digest can never equal a content digest, even
/// for a file whose contents happen to encode its own length.
const FAST_CHECK_DOMAIN: &[u8] = b"airlift:fast-check:v1";

/// Calculate the SHA-256 digest of a file's contents.
///
/// Returns the lowercase hexadecimal digest, streaming the file in 64KB
/// chunks so large archives never land in memory whole.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// The fast-check placeholder digest for a file of `byte_size` bytes.
///
/// Used for paths the hashing policy trusts by size rather than content.
/// Deterministic, so publisher and client agree as long as they share the
/// same policy.
pub fn fast_check_digest(byte_size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FAST_CHECK_DOMAIN);
    hasher.update(byte_size.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest a file under the given mode.
///
/// `Content` reads and hashes the file bytes; `FastCheck` only stats it.
pub fn digest_file(path: &Path, mode: HashMode) -> io::Result<String> {
    match mode {
        HashMode::Content => hash_file(path),
        HashMode::FastCheck => {
            let metadata = std::fs::metadata(path)?;
            Ok(fast_check_digest(metadata.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file_known_digest() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"hello world").unwrap();

        let digest = hash_file(&file_path).unwrap();

        // SHA-256 of "hello world"
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_hash_file_streams_past_buffer_size() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("large.bin");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(&vec![0xABu8; 100_000]).unwrap();

        let first = hash_file(&file_path).unwrap();
        let second = hash_file(&file_path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hash_file_missing() {
        assert!(hash_file(Path::new("/nonexistent/file.txt")).is_err());
    }

    #[test]
    fn test_fast_check_digest_depends_only_on_size() {
        assert_eq!(fast_check_digest(42), fast_check_digest(42));
        assert_ne!(fast_check_digest(42), fast_check_digest(43));
    }

    #[test]
    fn test_fast_check_digest_is_domain_separated() {
        // A fast-check digest of size N must differ from the content
        // digest of a file containing N's own encoding.
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("len.bin");
        let mut file = File::create(&file_path).unwrap();
        file.write_all(&8u64.to_le_bytes()).unwrap();

        assert_ne!(hash_file(&file_path).unwrap(), fast_check_digest(8));
    }

    #[test]
    fn test_digest_file_fast_check_does_not_read_contents() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.bin");
        let b = temp.path().join("b.bin");
        std::fs::write(&a, b"aaaa").unwrap();
        std::fs::write(&b, b"bbbb").unwrap();

        let da = digest_file(&a, HashMode::FastCheck).unwrap();
        let db = digest_file(&b, HashMode::FastCheck).unwrap();
        assert_eq!(da, db);

        assert_ne!(
            digest_file(&a, HashMode::Content).unwrap(),
            digest_file(&b, HashMode::Content).unwrap()
        );
    }
}
