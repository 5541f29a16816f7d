//! Checksum algorithms shared by packages, manifests, and downloads.

use crate::error::{Error, Result};
use crate::fs;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;

/// The checksum algorithms a [`crate::Package`]-like artifact may declare.
///
/// Wire representation is the lowercase string used by the fog (`sha1`,
/// `sha256`, `sha512`, `md5`); an unrecognized string is a load-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumType {
    /// SHA-1.
    Sha1,
    /// SHA-256. Also the default used to checksum the four artifact files
    /// themselves for `CheckUpdateRequest`.
    Sha256,
    /// SHA-512.
    Sha512,
    /// MD5, kept for legacy packages.
    Md5,
}

/// Default checksum algorithm used to hash the manifest/policy/settings/data
/// files for `CheckUpdateRequest`, independent of any package's own declared
/// `checksum_type`.
pub const SELECTED_CHECKSUM_TYPE: ChecksumType = ChecksumType::Sha256;

impl ChecksumType {
    /// Parse the lowercase wire string, failing on anything unrecognized.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "md5" => Ok(Self::Md5),
            other => Err(Error::UnknownChecksumType(other.to_string())),
        }
    }

    /// The lowercase wire string for this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Md5 => "md5",
        }
    }
}

/// Compute the hex digest of `path` under `checksum_type`.
pub fn calculate_checksum(checksum_type: ChecksumType, path: impl AsRef<Path>) -> Result<String> {
    let bytes = std::fs::read(&path).map_err(|source| Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    })?;
    Ok(calculate_checksum_bytes(checksum_type, &bytes))
}

/// Compute the hex digest of a string's UTF-8 bytes (used for hashing the
/// in-memory content of the four artifact files before a write completes).
pub fn calculate_checksum_str(checksum_type: ChecksumType, text: &str) -> String {
    calculate_checksum_bytes(checksum_type, text.as_bytes())
}

/// Compute the hex digest of an in-memory byte slice directly, without
/// staging it to a file first (used by the downloader to verify fetched
/// bytes before they are written to disk).
pub fn calculate_checksum_bytes(checksum_type: ChecksumType, bytes: &[u8]) -> String {
    match checksum_type {
        ChecksumType::Sha1 => {
            let mut hasher = Sha1::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        ChecksumType::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        ChecksumType::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(bytes);
            hex::encode(hasher.finalize())
        }
        ChecksumType::Md5 => {
            let digest = md5::Md5::digest(bytes);
            hex::encode(digest)
        }
    }
}

/// Checksum a file only if it exists and is non-empty, used by the update
/// loop to build `CheckUpdateRequest` for artifacts that may not be present
/// on a fresh host.
pub fn calculate_checksum_if_present(
    checksum_type: ChecksumType,
    path: impl AsRef<Path>,
) -> Result<Option<String>> {
    if fs::non_empty_file(&path) {
        Ok(Some(calculate_checksum(checksum_type, path)?))
    } else {
        Ok(None)
    }
}

// md-5 crate exposes its Digest under the name `md5`.
use md_5 as md5;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sha256_matches_known_vector() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"abc").unwrap();
        let digest = calculate_checksum(ChecksumType::Sha256, &path).unwrap();
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn unknown_checksum_type_errors() {
        assert!(ChecksumType::parse("sha3").is_err());
    }

    #[test]
    fn round_trips_wire_string() {
        for t in [
            ChecksumType::Sha1,
            ChecksumType::Sha256,
            ChecksumType::Sha512,
            ChecksumType::Md5,
        ] {
            assert_eq!(ChecksumType::parse(t.as_str()).unwrap(), t);
        }
    }
}
