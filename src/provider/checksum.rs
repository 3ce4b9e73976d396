//! Archive digests stored alongside uploaded artifacts.

use super::BackendKind;
use crate::error::{ArtifactError, ArtifactErrorKind, Operation};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Compare downloaded bytes against the digest recorded at upload time
///
/// Artifacts uploaded by other tools carry no digest and are accepted as-is.
pub(crate) fn verify_checksum(
    expected: Option<&str>,
    data: &[u8],
    backend: BackendKind,
    remote_key: &str,
) -> Result<(), ArtifactError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ArtifactError::new(
            ArtifactErrorKind::Io,
            backend,
            Operation::Download,
            remote_key,
            format!("checksum mismatch: expected sha256 {expected}, got {actual}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_checksum() {
        let digest = sha256_hex(b"pack");
        assert!(verify_checksum(Some(&digest), b"pack", BackendKind::S3, "k").is_ok());
        assert!(verify_checksum(None, b"pack", BackendKind::S3, "k").is_ok());

        let err = verify_checksum(Some(&digest), b"tampered", BackendKind::S3, "k").unwrap_err();
        assert_eq!(err.kind, ArtifactErrorKind::Io);
        assert!(err.message.contains("checksum mismatch"));
    }
}
