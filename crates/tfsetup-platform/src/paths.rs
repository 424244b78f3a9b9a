use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const CACHE_DIR_ENV: &str = "TERRAFORM_BIN_CACHE_DIR";
const CHECKSUM_DIR_ENV: &str = "TERRAFORM_BIN_CHECKSUM_DIR";
const WORK_DIR_ENV: &str = "STEP_TEMP_DIR";
const DEFAULT_BIN_DIR: &str = "/usr/local/bin";
const DEFAULT_CACHE_DIR: &str = ".terraform-bin-dir";

/// On-disk layout for acquired toolchains.
///
/// `cache_dirs` is the ordered, **untrusted** archive cache: all directories
/// are searched, downloads land in the last one, and nothing found there is
/// used without checksum verification. `checksum_dir` is the single
/// **trusted** directory for signature-verified checksum files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub cache_dirs: Vec<PathBuf>,
    pub checksum_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl ToolPaths {
    /// Build the layout from an environment snapshot.
    ///
    /// Cache directories come from a `:`-separated `TERRAFORM_BIN_CACHE_DIR`;
    /// both it and `TERRAFORM_BIN_CHECKSUM_DIR` default to
    /// `.terraform-bin-dir` in the working directory.
    #[must_use]
    pub fn from_env(env: &BTreeMap<String, String>) -> Self {
        let cache_dirs: Vec<PathBuf> = env
            .get(CACHE_DIR_ENV)
            .map_or(DEFAULT_CACHE_DIR, String::as_str)
            .split(':')
            .filter(|part| !part.is_empty())
            .map(PathBuf::from)
            .collect();
        let cache_dirs = if cache_dirs.is_empty() {
            vec![PathBuf::from(DEFAULT_CACHE_DIR)]
        } else {
            cache_dirs
        };

        Self {
            cache_dirs,
            checksum_dir: env
                .get(CHECKSUM_DIR_ENV)
                .map_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from),
            bin_dir: PathBuf::from(DEFAULT_BIN_DIR),
            work_dir: env
                .get(WORK_DIR_ENV)
                .map_or_else(std::env::temp_dir, PathBuf::from),
        }
    }

    /// The directory archives are downloaded into on a cache miss.
    #[must_use]
    pub fn download_dir(&self) -> &Path {
        self.cache_dirs
            .last()
            .map_or_else(|| Path::new(DEFAULT_CACHE_DIR), PathBuf::as_path)
    }

    /// Create the trusted and writable directories.
    ///
    /// Creation is idempotent; parallel CI jobs on the same runner may race
    /// to create the same directories.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.checksum_dir)?;
        std::fs::create_dir_all(self.download_dir())?;
        std::fs::create_dir_all(&self.work_dir)?;
        Ok(())
    }
}
