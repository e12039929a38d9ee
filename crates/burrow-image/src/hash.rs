//! SHA-256 content verification.
//!
//! Validates integrity of downloaded blobs against their manifest digests.

use std::path::Path;

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::Sha256Hash;
use sha2::{Digest, Sha256};

/// Computes the SHA-256 hash of a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    let io_err = |e| BurrowError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let _ = std::io::copy(&mut file, &mut hasher).map_err(io_err)?;
    let hash = Sha256Hash::from_hex(format!("{:x}", hasher.finalize()))?;
    tracing::debug!(path = %path.display(), %hash, "computed SHA-256 hash");
    Ok(hash)
}

/// Computes the SHA-256 hash of an in-memory buffer.
///
/// # Errors
///
/// Never fails in practice; the hex form is validated like any other hash.
pub fn hash_bytes(bytes: &[u8]) -> Result<Sha256Hash> {
    Sha256Hash::from_hex(format!("{:x}", Sha256::digest(bytes)))
}

/// Validates that a file matches the expected SHA-256 hash.
///
/// # Errors
///
/// Returns `BurrowError::HashMismatch` if the hashes do not match.
pub fn validate_hash(path: &Path, expected: &Sha256Hash) -> Result<()> {
    let actual = hash_file(path)?;
    check(&path.display().to_string(), expected, &actual)
}

/// Validates that a buffer matches the expected SHA-256 hash.
///
/// # Errors
///
/// Returns `BurrowError::HashMismatch` if the hashes do not match.
pub fn validate_bytes(resource: &str, bytes: &[u8], expected: &Sha256Hash) -> Result<()> {
    let actual = hash_bytes(bytes)?;
    check(resource, expected, &actual)
}

fn check(resource: &str, expected: &Sha256Hash, actual: &Sha256Hash) -> Result<()> {
    if expected == actual {
        return Ok(());
    }
    Err(BurrowError::HashMismatch {
        resource: resource.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}
