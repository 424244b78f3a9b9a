use std::path::{Path, PathBuf};

use tfsetup_core::{Product, Version};
use tfsetup_platform::{HostPlatform, ToolPaths};
use tfsetup_opentofu::OpenTofuReleases;
use tfsetup_terraform::TerraformReleases;

use crate::checksums::{find_checksum, sha256_file};
use crate::error::InstallError;
use crate::signature::{GpgVerifier, SignatureVerifier};

/// Maps a resolved version onto a verified local executable.
///
/// Checksum and signature files live in a trusted directory and are fetched
/// at most once per version. Archives live in an ordered list of untrusted
/// cache directories and are re-verified against the signed checksums file on
/// every use, cache hit or not.
pub struct Installer {
    http: reqwest::Client,
    paths: ToolPaths,
    platform: HostPlatform,
    terraform: TerraformReleases,
    opentofu: OpenTofuReleases,
    verifier: Box<dyn SignatureVerifier>,
}

impl Installer {
    #[must_use]
    pub fn new(http: reqwest::Client, paths: ToolPaths, platform: HostPlatform) -> Self {
        Self {
            terraform: TerraformReleases::new(http.clone()),
            opentofu: OpenTofuReleases::new(http.clone()),
            verifier: Box::new(GpgVerifier::default()),
            http,
            paths,
            platform,
        }
    }

    #[must_use]
    pub fn with_verifier(mut self, verifier: Box<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    #[must_use]
    pub fn with_terraform(mut self, terraform: TerraformReleases) -> Self {
        self.terraform = terraform;
        self
    }

    #[must_use]
    pub fn with_opentofu(mut self, opentofu: OpenTofuReleases) -> Self {
        self.opentofu = opentofu;
        self
    }

    /// Get a verified executable for the given version, downloading the
    /// archive if no cache directory has it.
    ///
    /// This does not touch the well-known symlinks; see [`Self::install`].
    ///
    /// # Errors
    /// Fails on transport problems, a version/platform that does not exist
    /// upstream, or any integrity failure.
    pub async fn executable(&self, version: &Version) -> Result<PathBuf, InstallError> {
        self.ensure_checksums(version).await?;
        let (cache_dir, archive_name) = self.locate_archive(version).await?;
        self.verify_archive(version, &cache_dir, &archive_name)?;
        self.extract_executable(version, &cache_dir.join(&archive_name))
    }

    /// Get a verified executable and point the product's well-known
    /// symlink(s) at it.
    ///
    /// # Errors
    /// Fails as [`Self::executable`] does, or if the symlink swap fails.
    pub async fn install(&self, version: &Version) -> Result<PathBuf, InstallError> {
        let executable = self.executable(version).await?;

        for link_name in symlink_names(version.product) {
            let link = self.paths.bin_dir.join(link_name);
            swap_symlink(&executable, &link)
                .map_err(|error| InstallError::io("failed to update symlink", error))?;
            log::info!("{} -> {}", link.display(), executable.display());
        }

        Ok(executable)
    }

    fn archive_name(&self, version: &Version) -> String {
        match version.product {
            Product::Terraform => tfsetup_terraform::archive_name(version, self.platform),
            Product::OpenTofu => tfsetup_opentofu::archive_name(version, self.platform),
        }
    }

    fn checksums_name(version: &Version) -> String {
        match version.product {
            Product::Terraform => tfsetup_terraform::checksums_name(version),
            Product::OpenTofu => tfsetup_opentofu::checksums_name(version),
        }
    }

    fn signature_name(version: &Version) -> String {
        match version.product {
            Product::Terraform => tfsetup_terraform::signature_name(version),
            Product::OpenTofu => tfsetup_opentofu::signature_name(version),
        }
    }

    /// Ensure the signature-verified checksums file for this version is
    /// present in the trusted directory.
    ///
    /// The two downloads are independent and run concurrently, but both are
    /// joined before the signature is checked and nothing reads the checksums
    /// file until that check passes.
    async fn ensure_checksums(&self, version: &Version) -> Result<PathBuf, InstallError> {
        std::fs::create_dir_all(&self.paths.checksum_dir)
            .map_err(|error| InstallError::io("failed to create checksum directory", error))?;

        let checksums_path = self.paths.checksum_dir.join(Self::checksums_name(version));
        let signature_path = self.paths.checksum_dir.join(Self::signature_name(version));

        let signature_required = match version.product {
            Product::Terraform => tfsetup_terraform::signature_required(version),
            Product::OpenTofu => tfsetup_opentofu::signature_required(version),
        };

        let fetch_signature = async {
            if signature_path.exists() {
                return Ok(());
            }
            let url = match version.product {
                Product::Terraform => self.terraform.signature_url(version),
                Product::OpenTofu => self.opentofu.signature_url(version),
            };
            match self.fetch_file(&url, &signature_path, "signature download").await {
                Err(InstallError::HttpStatus { status, .. })
                    if status == reqwest::StatusCode::NOT_FOUND =>
                {
                    if signature_required {
                        Err(InstallError::VersionNotFound {
                            product: version.product,
                            version: version.clone(),
                            what: "signature file",
                        })
                    } else {
                        log::warn!("no signature published for pre-release {version}");
                        Ok(())
                    }
                }
                other => other,
            }
        };

        let fetch_checksums = async {
            if checksums_path.exists() {
                return Ok(());
            }
            let url = match version.product {
                Product::Terraform => self.terraform.checksums_url(version),
                Product::OpenTofu => self.opentofu.checksums_url(version),
            };
            match self.fetch_file(&url, &checksums_path, "checksums download").await {
                Err(InstallError::HttpStatus { status, .. })
                    if status == reqwest::StatusCode::NOT_FOUND =>
                {
                    Err(InstallError::VersionNotFound {
                        product: version.product,
                        version: version.clone(),
                        what: "checksums",
                    })
                }
                other => other,
            }
        };

        tokio::try_join!(fetch_signature, fetch_checksums)?;

        if signature_path.exists() {
            self.verifier
                .verify(&signature_path, &checksums_path)
                .await
                .map_err(|error| InstallError::SignatureRejected {
                    product: version.product,
                    version: version.clone(),
                    details: error.to_string(),
                })?;
        }

        Ok(checksums_path)
    }

    /// Find the archive in the untrusted cache directories, downloading it
    /// into the last one on a miss.
    async fn locate_archive(&self, version: &Version) -> Result<(PathBuf, String), InstallError> {
        let archive_name = self.archive_name(version);

        for cache_dir in &self.paths.cache_dirs {
            if cache_dir.join(&archive_name).is_file() {
                log::debug!("found {archive_name} in {}", cache_dir.display());
                return Ok((cache_dir.clone(), archive_name));
            }
        }

        let download_dir = self.paths.download_dir().to_path_buf();
        std::fs::create_dir_all(&download_dir)
            .map_err(|error| InstallError::io("failed to create cache directory", error))?;

        let url = match version.product {
            Product::Terraform => self.terraform.archive_url(version, self.platform),
            Product::OpenTofu => self.opentofu.archive_url(version, self.platform),
        };
        match self
            .fetch_file(&url, &download_dir.join(&archive_name), "archive download")
            .await
        {
            Err(InstallError::HttpStatus { status, .. })
                if status == reqwest::StatusCode::NOT_FOUND =>
            {
                Err(InstallError::PlatformNotFound {
                    product: version.product,
                    version: version.clone(),
                    platform: self.platform.to_string(),
                })
            }
            Err(error) => Err(error),
            Ok(()) => Ok((download_dir, archive_name)),
        }
    }

    /// Verify an archive against the already signature-verified checksums
    /// file. Runs on every use; cached archives are never trusted without it.
    fn verify_archive(
        &self,
        version: &Version,
        cache_dir: &Path,
        archive_name: &str,
    ) -> Result<(), InstallError> {
        let checksums_path = self.paths.checksum_dir.join(Self::checksums_name(version));
        let checksums = std::fs::read_to_string(&checksums_path)
            .map_err(|error| InstallError::io("failed to read checksums file", error))?;

        let expected =
            find_checksum(&checksums, archive_name).ok_or_else(|| InstallError::ChecksumMissing {
                archive: archive_name.to_string(),
            })?;
        let actual = sha256_file(&cache_dir.join(archive_name))?;

        if actual.eq_ignore_ascii_case(&expected) {
            Ok(())
        } else {
            Err(InstallError::ChecksumMismatch {
                archive: archive_name.to_string(),
                expected,
                actual,
            })
        }
    }

    /// Extract the product executable into a per-version work directory and
    /// mark it executable.
    fn extract_executable(
        &self,
        version: &Version,
        archive_path: &Path,
    ) -> Result<PathBuf, InstallError> {
        let mut executable_name = version.product.executable_name().to_string();
        if self.platform.os == "windows" {
            executable_name.push_str(".exe");
        }

        let target_dir = self
            .paths
            .work_dir
            .join(format!("{}_{version}", version.product.archive_prefix()));
        std::fs::create_dir_all(&target_dir)
            .map_err(|error| InstallError::io("failed to create work directory", error))?;

        let target_path = target_dir.join(&executable_name);
        if target_path.exists() {
            std::fs::remove_file(&target_path)
                .map_err(|error| InstallError::io("failed to remove stale executable", error))?;
        }

        let file = std::fs::File::open(archive_path)
            .map_err(|error| InstallError::io("failed to open archive", error))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|error| InstallError::zip("failed to read archive", error))?;
        let mut entry =
            archive
                .by_name(&executable_name)
                .map_err(|_| InstallError::MissingExecutable {
                    executable: executable_name.clone(),
                })?;

        let mut out = std::fs::File::create(&target_path)
            .map_err(|error| InstallError::io("failed to create executable", error))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|error| InstallError::io("failed to extract executable", error))?;
        drop(out);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target_path, std::fs::Permissions::from_mode(0o755))
                .map_err(|error| InstallError::io("failed to mark executable", error))?;
        }

        Ok(target_path)
    }

    async fn fetch_file(
        &self,
        url: &str,
        dest: &Path,
        context: &'static str,
    ) -> Result<(), InstallError> {
        log::debug!("downloading {url}");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| InstallError::http(context, error))?;

        if !response.status().is_success() {
            return Err(InstallError::HttpStatus {
                context,
                status: response.status(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| InstallError::http(context, error))?;

        // Write-then-rename so a parallel job on the same runner never reads
        // a half-written file.
        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        let temp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|error| InstallError::io("failed to create download temp file", error))?;
        std::fs::write(temp.path(), &bytes)
            .map_err(|error| InstallError::io("failed to write download", error))?;
        temp.persist(dest)
            .map_err(|error| InstallError::io("failed to move download into place", error.error))?;

        Ok(())
    }
}

/// Well-known symlink names per product. OpenTofu keeps a `tofu` alias next
/// to its product symlink.
fn symlink_names(product: Product) -> &'static [&'static str] {
    match product {
        Product::Terraform => &["terraform"],
        Product::OpenTofu => &["opentofu", "tofu"],
    }
}

/// Atomically repoint `link` at `target` by staging a fresh symlink and
/// renaming it over the old one.
fn swap_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    let file_name = link
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| std::io::Error::other("symlink path has no file name"))?;
    let staging = link.with_file_name(format!(".{file_name}.{}", std::process::id()));
    let _ = std::fs::remove_file(&staging);

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, &staging)?;
    #[cfg(windows)]
    std::os::windows::fs::symlink_file(target, &staging)?;

    std::fs::rename(&staging, link)
}
