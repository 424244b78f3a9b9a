use tfsetup_core::{Product, Version};

/// Acquisition failures.
///
/// Integrity failures (`SignatureRejected`, `ChecksumMismatch`,
/// `ChecksumMissing`) are always fatal; the engine never falls back to an
/// unverified binary. 404s are specialized into the two "does this exist?"
/// variants so users can tell a missing version from a flaky network.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("could not download {what} for {product} {version} - does this version exist?")]
    VersionNotFound {
        product: Product,
        version: Version,
        what: &'static str,
    },

    #[error(
        "could not download archive for {product} {version} - does this version exist for this platform ({platform})?"
    )]
    PlatformNotFound {
        product: Product,
        version: Version,
        platform: String,
    },

    #[error("could not verify checksums signature for {product} {version}: {details}")]
    SignatureRejected {
        product: Product,
        version: Version,
        details: String,
    },

    #[error("checksum mismatch for {archive}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        archive: String,
        expected: String,
        actual: String,
    },

    #[error("no checksum entry for {archive} in the verified checksums file")]
    ChecksumMissing { archive: String },

    #[error("{executable} not found in the release archive")]
    MissingExecutable { executable: String },

    #[error("{context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context} returned HTTP {status}")]
    HttpStatus {
        context: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Zip {
        context: &'static str,
        #[source]
        source: zip::result::ZipError,
    },
}

impl InstallError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn http(context: &'static str, source: reqwest::Error) -> Self {
        Self::Http { context, source }
    }

    pub(crate) fn zip(context: &'static str, source: zip::result::ZipError) -> Self {
        Self::Zip { context, source }
    }
}
