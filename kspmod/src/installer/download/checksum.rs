//! SHA-256 checksum calculation for downloaded archives.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::installer::error::{InstallError, InstallResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the lowercase hex SHA-256 of a file.
pub fn calculate_file_checksum(path: &Path) -> InstallResult<String> {
    let mut file = File::open(path).map_err(|e| InstallError::filesystem(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| InstallError::filesystem(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Verify that the archive of `identifier` at `path` matches `expected`.
///
/// Comparison ignores case.
pub fn verify_checksum(identifier: &str, path: &Path, expected: &str) -> InstallResult<()> {
    let actual = calculate_file_checksum(path)?;
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(InstallError::ChecksumMismatch {
            identifier: identifier.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
