//! Integrity verification.
//!
//! The pinned checksum in the formula is the sole trust anchor for
//! supply-chain integrity: nothing downstream of the fetcher runs until the
//! downloaded bytes match it. Head checkouts skip this step and trust the
//! source-control transport instead; the pipeline says so out loud.

use std::io::Read;
use std::path::Path;

use sha2::Digest;

use crate::descriptor::ChecksumAlgorithm;
use crate::error::InstallError;

/// Chunk size for reading files during hashing (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Verify a file's digest against the expected hex value.
///
/// Comparison is case-insensitive and examines every byte of both digests
/// regardless of where the first difference occurs.
pub fn verify(
    file: &Path,
    expected: &str,
    algorithm: ChecksumAlgorithm,
) -> Result<(), InstallError> {
    let actual = compute_digest(file, algorithm)?;
    let expected = expected.to_lowercase();

    if !digest_eq(expected.as_bytes(), actual.as_bytes()) {
        return Err(InstallError::ChecksumMismatch { expected, actual });
    }

    Ok(())
}

/// Compute the hex digest of a file's contents.
pub fn compute_digest(file: &Path, algorithm: ChecksumAlgorithm) -> Result<String, InstallError> {
    let mut f = std::fs::File::open(file)?;
    match algorithm {
        ChecksumAlgorithm::Sha256 => hash_reader::<sha2::Sha256>(&mut f),
    }
}

fn hash_reader<D: Digest>(reader: &mut impl Read) -> Result<String, InstallError> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Fixed-structure equality: the whole length is always walked.
fn digest_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    // SHA256 of "hello world"
    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn write_file(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.tar.gz");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_verify_matching_digest() {
        let (_dir, path) = write_file(b"hello world");
        verify(&path, HELLO_SHA256, ChecksumAlgorithm::Sha256).unwrap();
    }

    #[test]
    fn test_verify_is_case_insensitive() {
        let (_dir, path) = write_file(b"hello world");
        verify(
            &path,
            &HELLO_SHA256.to_uppercase(),
            ChecksumAlgorithm::Sha256,
        )
        .unwrap();
    }

    #[test]
    fn test_single_flipped_char_fails() {
        let (_dir, path) = write_file(b"hello world");
        let mut tampered = HELLO_SHA256.to_string();
        tampered.replace_range(0..1, "c");

        let err = verify(&path, &tampered, ChecksumAlgorithm::Sha256).unwrap_err();
        match err {
            InstallError::ChecksumMismatch { expected, actual } => {
                assert_eq!(expected, tampered);
                assert_eq!(actual, HELLO_SHA256);
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_never_matches_a_pinned_digest() {
        let (_dir, path) = write_file(b"");
        let err = verify(&path, HELLO_SHA256, ChecksumAlgorithm::Sha256).unwrap_err();
        assert!(matches!(err, InstallError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_missing_file_is_io_not_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify(
            &dir.path().join("nope"),
            HELLO_SHA256,
            ChecksumAlgorithm::Sha256,
        )
        .unwrap_err();
        assert!(matches!(err, InstallError::Io(_)));
    }

    #[test]
    fn test_digest_eq() {
        assert!(digest_eq(b"abcd", b"abcd"));
        assert!(!digest_eq(b"abcd", b"abce"));
        assert!(!digest_eq(b"abcd", b"abc"));
    }
}
