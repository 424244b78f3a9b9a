use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostPlatformError {
    #[error("Unknown operating system {os:?} - no release archives exist for it")]
    UnknownOs { os: String },
    #[error("Unknown architecture {arch:?} - no release archives exist for it")]
    UnknownArch { arch: String },
}

/// The host OS and CPU expressed in the release-archive naming scheme
/// shared by both products, e.g. `linux_amd64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: &'static str,
    pub arch: &'static str,
}

impl HostPlatform {
    /// Map an OS/CPU descriptor onto the release naming scheme.
    ///
    /// Accepts the spellings used by `std::env::consts` as well as the
    /// already-normalized release names.
    ///
    /// # Errors
    /// Returns a descriptive error for any combination the products do not
    /// publish archives for; there is no silent default.
    pub fn from_labels(os: &str, arch: &str) -> Result<Self, HostPlatformError> {
        let os = match os {
            "linux" => "linux",
            "macos" | "darwin" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            "openbsd" => "openbsd",
            other => {
                return Err(HostPlatformError::UnknownOs {
                    os: other.to_string(),
                });
            }
        };

        let arch = match arch {
            "x86_64" | "amd64" => "amd64",
            "x86" | "i386" | "i686" | "386" => "386",
            "aarch64" | "arm64" => "arm64",
            "arm" | "armv7" | "armv6" => "arm",
            other => {
                return Err(HostPlatformError::UnknownArch {
                    arch: other.to_string(),
                });
            }
        };

        Ok(Self { os, arch })
    }

    /// The platform this binary was compiled for.
    ///
    /// # Errors
    /// Returns an error when the build target has no release archives.
    pub fn detect() -> Result<Self, HostPlatformError> {
        Self::from_labels(std::env::consts::OS, std::env::consts::ARCH)
    }

    #[must_use]
    pub fn is_arm64(&self) -> bool {
        self.arch == "arm64"
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}
