//! SHA-256 integrity checks for downloaded builds.
//!
//! Only the nightly channel publishes a hash (in its build manifest), so
//! this is applied to nightly downloads of the architecture that manifest
//! describes. Stable and pre-release downloads are not verified.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};

/// Checks that `file_path` hashes to `expected` (hex, any case).
///
/// # Errors
///
/// Returns an error if the file cannot be read or the digest differs.
pub fn verify_sha256(file_path: &Path, expected: &str) -> Result<()> {
    let computed = sha256_file(file_path)?;
    let expected = expected.trim().to_lowercase();

    if computed != expected {
        bail!(
            "SHA-256 mismatch for {}: expected {expected}, got {computed}",
            file_path.display()
        );
    }

    Ok(())
}

/// Hashes a file in 8 KiB chunks and returns the lowercase hex digest.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn sha256_file(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open {} for hashing", file_path.display()))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {} for hashing", file_path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}
