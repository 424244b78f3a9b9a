use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("signature verification rejected the file: {stderr}")]
    Rejected { stderr: String },
    #[error("failed to run the signature verifier: {0}")]
    Io(#[from] std::io::Error),
}

/// Seam for detached-signature verification of a checksums file.
///
/// The checksums file must never be consulted before this has succeeded.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, signature: &Path, payload: &Path) -> Result<(), SignatureError>;
}

/// Verifies with `gpg --verify` against a dedicated trusted keyring.
///
/// The keyring directory is provisioned with the product signing keys when
/// the CI image is built; this code only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct GpgVerifier {
    gnupg_home: Option<PathBuf>,
}

impl GpgVerifier {
    #[must_use]
    pub fn new(gnupg_home: Option<PathBuf>) -> Self {
        Self { gnupg_home }
    }
}

#[async_trait]
impl SignatureVerifier for GpgVerifier {
    async fn verify(&self, signature: &Path, payload: &Path) -> Result<(), SignatureError> {
        let mut command = tokio::process::Command::new("gpg");
        command.arg("--verify").arg(signature).arg(payload);
        if let Some(home) = &self.gnupg_home {
            command.env("GNUPGHOME", home);
        }

        let output = command.output().await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SignatureError::Rejected {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Test double that accepts or rejects everything.
    pub struct StaticVerifier {
        pub accept: bool,
        pub calls: std::sync::atomic::AtomicUsize,
    }

    impl StaticVerifier {
        pub fn accepting() -> Self {
            Self {
                accept: true,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        pub fn rejecting() -> Self {
            Self {
                accept: false,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SignatureVerifier for StaticVerifier {
        async fn verify(&self, _signature: &Path, _payload: &Path) -> Result<(), SignatureError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            if self.accept {
                Ok(())
            } else {
                Err(SignatureError::Rejected {
                    stderr: "BAD signature".to_string(),
                })
            }
        }
    }
}
