use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use tfsetup_core::{Product, Version};
use tfsetup_platform::HostPlatform;

const DEFAULT_BASE_URL: &str = "https://releases.hashicorp.com";

/// Identity of the HashiCorp release-signing key, as embedded in the
/// published signature file names.
const SIGNING_KEY_ID: &str = "72D7468F";

static VERSION_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(\d+\.\d+\.\d+(?:-[0-9A-Za-z_-]+)?)").expect("version href pattern compiles")
});

#[derive(Debug, thiserror::Error)]
pub enum ReleasesError {
    #[error("failed to fetch the terraform release index: {0}")]
    Request(#[source] reqwest::Error),
    #[error("terraform release index returned HTTP {status}")]
    HttpStatus { status: reqwest::StatusCode },
}

/// Client for the HashiCorp release site.
///
/// The release index is plain HTML; versions are scraped from the per-version
/// hrefs rather than parsed from a structured document.
#[derive(Debug, Clone)]
pub struct TerraformReleases {
    http: reqwest::Client,
    base_url: String,
}

impl TerraformReleases {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// List every Terraform version currently published upstream.
    ///
    /// # Errors
    /// Returns an error when the index cannot be fetched.
    pub async fn list_versions(&self) -> Result<Vec<Version>, ReleasesError> {
        let url = format!("{}/terraform/", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(ReleasesError::Request)?;

        if !response.status().is_success() {
            return Err(ReleasesError::HttpStatus {
                status: response.status(),
            });
        }

        let body = response.text().await.map_err(ReleasesError::Request)?;
        let versions = parse_release_index(&body);
        log::debug!("release index lists {} terraform versions", versions.len());
        Ok(versions)
    }

    #[must_use]
    pub fn archive_url(&self, version: &Version, platform: HostPlatform) -> String {
        format!(
            "{}/terraform/{version}/{}",
            self.base_url,
            archive_name(version, platform)
        )
    }

    #[must_use]
    pub fn checksums_url(&self, version: &Version) -> String {
        format!(
            "{}/terraform/{version}/{}",
            self.base_url,
            checksums_name(version)
        )
    }

    #[must_use]
    pub fn signature_url(&self, version: &Version) -> String {
        format!(
            "{}/terraform/{version}/{}",
            self.base_url,
            signature_name(version)
        )
    }
}

/// Extract versions from the release index page.
#[must_use]
pub fn parse_release_index(body: &str) -> Vec<Version> {
    let mut seen = HashSet::new();
    VERSION_HREF
        .captures_iter(body)
        .filter_map(|captures| {
            let text = captures.get(1)?.as_str();
            Version::parse(text, Product::Terraform).ok()
        })
        .filter(|version| seen.insert(version.clone()))
        .collect()
}

#[must_use]
pub fn archive_name(version: &Version, platform: HostPlatform) -> String {
    format!("terraform_{version}_{platform}.zip")
}

#[must_use]
pub fn checksums_name(version: &Version) -> String {
    format!("terraform_{version}_SHA256SUMS")
}

#[must_use]
pub fn signature_name(version: &Version) -> String {
    format!("terraform_{version}_SHA256SUMS.{SIGNING_KEY_ID}.sig")
}

/// Terraform releases are always signed; there is no tolerated-missing case.
#[must_use]
pub fn signature_required(_version: &Version) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn parses_versions_out_of_index_hrefs() {
        let body = r#"
            <li><a href="/terraform/1.5.7/">terraform_1.5.7</a></li>
            <li><a href="/terraform/1.6.0-rc1/">terraform_1.6.0-rc1</a></li>
            <li><a href="/terraform/0.11.14/">terraform_0.11.14</a></li>
        "#;

        let versions = parse_release_index(body);
        assert_eq!(versions, vec![v("1.5.7"), v("1.6.0-rc1"), v("0.11.14")]);
    }

    #[test]
    fn ignores_non_version_hrefs_and_duplicates() {
        let body = r#"
            <a href="/terraform/">index</a>
            <a href="/terraform/1.5.7/">first</a>
            <a href="/terraform/1.5.7/">again</a>
        "#;

        let versions = parse_release_index(body);
        assert_eq!(versions, vec![v("1.5.7")]);
    }

    #[test]
    fn url_and_file_name_scheme() {
        let releases = TerraformReleases::new(reqwest::Client::new());
        let platform = tfsetup_platform::HostPlatform::from_labels("linux", "amd64")
            .expect("known platform");
        let version = v("1.5.7");

        assert_eq!(
            releases.archive_url(&version, platform),
            "https://releases.hashicorp.com/terraform/1.5.7/terraform_1.5.7_linux_amd64.zip"
        );
        assert_eq!(
            checksums_name(&version),
            "terraform_1.5.7_SHA256SUMS"
        );
        assert_eq!(
            signature_name(&version),
            "terraform_1.5.7_SHA256SUMS.72D7468F.sig"
        );
        assert!(signature_required(&version));
    }
}
