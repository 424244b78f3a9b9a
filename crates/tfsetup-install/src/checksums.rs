use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::InstallError;

/// Find the hash for `file_name` in a `SHA256SUMS`-style listing.
///
/// Lines are `<hex hash><whitespace><name>`; names may carry a `*` binary
/// marker or a `./` prefix.
#[must_use]
pub fn find_checksum(checksums: &str, file_name: &str) -> Option<String> {
    checksums.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts
            .next()?
            .trim_start_matches('*')
            .trim_start_matches("./");
        if name == file_name {
            Some(hash.to_ascii_lowercase())
        } else {
            None
        }
    })
}

/// SHA-256 of a file, streamed in 8 KiB chunks.
///
/// # Errors
/// Returns an error when the file cannot be opened or read.
pub fn sha256_file(path: &Path) -> Result<String, InstallError> {
    let mut file = std::fs::File::open(path)
        .map_err(|error| InstallError::io("failed to open file for checksum", error))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];

    loop {
        let read = file
            .read(&mut buffer)
            .map_err(|error| InstallError::io("failed to read file for checksum", error))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
