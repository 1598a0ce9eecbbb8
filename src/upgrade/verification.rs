use crate::core::{Result, UpdateError};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Verifies downloaded files against an expected SHA-256 digest.
///
/// Digests are hex strings, compared case-insensitively. An optional
/// `sha256:` prefix on the expected value is accepted.
pub struct ChecksumVerifier;

impl ChecksumVerifier {
    /// Hex-encoded SHA-256 of a file's contents.
    pub async fn compute_sha256(file_path: &Path) -> Result<String> {
        debug!("Computing SHA256 checksum for: {}", file_path.display());

        let contents =
            fs::read(file_path).await.map_err(|e| UpdateError::io("Reading file for checksum", file_path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Checks `file_path` against `expected`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::ChecksumMismatch`] when the digests differ, or an I/O
    /// error when the file cannot be read. The file is left in place.
    pub async fn verify(file_path: &Path, expected: &str) -> Result<()> {
        let actual = Self::compute_sha256(file_path).await?;
        let expected = expected.trim();
        let expected_hex = expected.strip_prefix("sha256:").unwrap_or(expected);

        if !actual.eq_ignore_ascii_case(expected_hex) {
            return Err(UpdateError::ChecksumMismatch {
                path: file_path.to_path_buf(),
                expected: expected_hex.to_lowercase(),
                actual,
            });
        }

        info!("Checksum verified for {}", file_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_compute_sha256() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Hello, World!").unwrap();

        let checksum = ChecksumVerifier::compute_sha256(temp_file.path()).await.unwrap();
        assert_eq!(checksum, "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f");
    }

    #[tokio::test]
    async fn test_verify_accepts_prefix_and_uppercase() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Test").unwrap();

        let lowercase = "532eaabd9574880dbf76b9b8cc00832c20a6ec113d682299550d7a6e0f345e25";
        let uppercase = "sha256:532EAABD9574880DBF76B9B8CC00832C20A6EC113D682299550D7A6E0F345E25";

        ChecksumVerifier::verify(temp_file.path(), lowercase).await.unwrap();
        ChecksumVerifier::verify(temp_file.path(), uppercase).await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_mismatch() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"Test content").unwrap();

        let wrong = "0".repeat(64);
        let err = ChecksumVerifier::verify(temp_file.path(), &wrong).await.unwrap_err();
        match err {
            UpdateError::ChecksumMismatch {
                expected,
                actual,
                ..
            } => {
                assert_eq!(expected, wrong);
                assert_ne!(actual, wrong);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(temp_file.path().exists());
    }
}
