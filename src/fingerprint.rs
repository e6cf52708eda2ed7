// src/fingerprint.rs
//! Content identity used to decide whether a shelved file changed since it was
//! shelved.

use crate::error::{MicrobranchError, Result};
use md5::{Digest, Md5};
use std::fs;
use std::path::Path;

/// How a manifest encodes its per-file fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintScheme {
    /// Changeset id of the file's last commit plus a CRC32 of the bytes.
    LegacyChangesetCrc,
    /// MD5 of the file bytes alone.
    ContentDigest,
}

impl FingerprintScheme {
    /// Selects the scheme for a manifest version. Versions up to 1 predate
    /// content digests.
    #[must_use]
    pub fn for_version(version: u32) -> Self {
        if version <= 1 {
            Self::LegacyChangesetCrc
        } else {
            Self::ContentDigest
        }
    }
}

/// Hex MD5 of a byte slice.
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hex MD5 of a file's bytes.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn file_digest(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(MicrobranchError::io(path))?;
    Ok(content_digest(&bytes))
}

/// CRC32 of a file's bytes, for legacy manifests.
///
/// # Errors
/// Returns error if the file cannot be read.
pub fn file_crc32(path: &Path) -> Result<u32> {
    let bytes = fs::read(path).map_err(MicrobranchError::io(path))?;
    Ok(crc32fast::hash(&bytes))
}
