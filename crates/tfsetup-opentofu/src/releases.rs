use serde::Deserialize;

use tfsetup_core::{Product, Version};
use tfsetup_platform::HostPlatform;

const DEFAULT_API_URL: &str = "https://api.github.com";
const DEFAULT_DOWNLOAD_URL: &str = "https://github.com/opentofu/opentofu/releases/download";

#[derive(Debug, thiserror::Error)]
pub enum ReleasesError {
    #[error("failed to fetch the opentofu release listing: {0}")]
    Request(#[source] reqwest::Error),
    #[error("opentofu release listing returned HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
    #[error("failed to parse the opentofu release listing: {0}")]
    Parse(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
}

/// Client for the OpenTofu release listing on the GitHub API.
#[derive(Debug, Clone)]
pub struct OpenTofuReleases {
    http: reqwest::Client,
    api_url: String,
    download_url: String,
    token: Option<String>,
}

impl OpenTofuReleases {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    #[must_use]
    pub fn with_download_url(mut self, download_url: impl Into<String>) -> Self {
        self.download_url = download_url.into();
        self
    }

    /// Authenticate listing requests; unauthenticated GitHub API calls are
    /// heavily rate-limited on shared CI runners.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// List every OpenTofu version currently published upstream.
    ///
    /// # Errors
    /// Returns an error when the listing cannot be fetched or parsed.
    pub async fn list_versions(&self) -> Result<Vec<Version>, ReleasesError> {
        let url = format!("{}/repos/opentofu/opentofu/releases", self.api_url);
        let mut request = self.http.get(&url).query(&[("per_page", "100")]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(ReleasesError::Request)?;
        if !response.status().is_success() {
            return Err(ReleasesError::HttpStatus {
                status: response.status(),
            });
        }

        let releases: Vec<GitHubRelease> =
            response.json().await.map_err(ReleasesError::Parse)?;
        Ok(parse_release_tags(
            releases.iter().map(|release| release.tag_name.as_str()),
        ))
    }

    #[must_use]
    pub fn archive_url(&self, version: &Version, platform: HostPlatform) -> String {
        format!(
            "{}/v{version}/{}",
            self.download_url,
            archive_name(version, platform)
        )
    }

    #[must_use]
    pub fn checksums_url(&self, version: &Version) -> String {
        format!("{}/v{version}/{}", self.download_url, checksums_name(version))
    }

    #[must_use]
    pub fn signature_url(&self, version: &Version) -> String {
        format!("{}/v{version}/{}", self.download_url, signature_name(version))
    }
}

/// Turn release tags (`v1.6.2`, ...) into versions, skipping tags that are
/// not versions at all.
pub fn parse_release_tags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<Version> {
    tags.filter_map(|tag| match Version::parse(tag, Product::OpenTofu) {
        Ok(version) => Some(version),
        Err(error) => {
            log::debug!("skipping release tag {tag:?}: {error}");
            None
        }
    })
    .collect()
}

#[must_use]
pub fn archive_name(version: &Version, platform: HostPlatform) -> String {
    format!("tofu_{version}_{platform}.zip")
}

#[must_use]
pub fn checksums_name(version: &Version) -> String {
    format!("tofu_{version}_SHA256SUMS")
}

#[must_use]
pub fn signature_name(version: &Version) -> String {
    format!("tofu_{version}_SHA256SUMS.gpgsig")
}

/// OpenTofu pre-releases have shipped without a signature file; only releases
/// are required to carry one.
#[must_use]
pub fn signature_required(version: &Version) -> bool {
    !version.is_pre_release()
}
