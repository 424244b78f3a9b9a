//! Secure acquisition of toolchain executables.
//!
//! Flow per resolved version: fetch (or reuse) the upstream checksums file
//! and its detached signature into a trusted directory, verify the signature
//! against the trusted keyring, locate or download the platform archive in
//! the untrusted cache directories, verify its checksum against the signed
//! checksums file, then extract and install the executable behind an
//! atomically swapped symlink.

mod checksums;
mod error;
mod installer;
mod signature;

pub use checksums::{find_checksum, sha256_file};
pub use error::InstallError;
pub use installer::Installer;
pub use signature::{GpgVerifier, SignatureError, SignatureVerifier};
