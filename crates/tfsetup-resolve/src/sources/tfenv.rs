use async_trait::async_trait;
use regex::Regex;

use tfsetup_core::{
    DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource, latest,
    latest_non_prerelease,
};

/// Stage 4: a tfenv `.terraform-version` file in the module directory.
///
/// Supports a literal version, `latest`, and `latest:<regex>` (the latest
/// version whose rendering matches the regex).
pub struct TfenvSource;

#[derive(Debug, thiserror::Error)]
enum TfenvError {
    #[error("no versions match regex {pattern}")]
    NoRegexMatch { pattern: String },
    #[error("invalid regex {pattern}: {source}")]
    BadRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    BadVersion(#[from] tfsetup_core::VersionParseError),
    #[error("no non-prerelease versions are available")]
    NoVersions,
}

fn parse_tfenv(
    contents: &str,
    candidates: &[Version],
    ctx: &ResolveContext,
) -> Result<Version, TfenvError> {
    let spec = contents.trim();

    if spec == "latest" {
        return latest_non_prerelease(candidates).ok_or(TfenvError::NoVersions);
    }

    if let Some(pattern) = spec.strip_prefix("latest:") {
        let regex = Regex::new(pattern).map_err(|source| TfenvError::BadRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        let matched: Vec<Version> = candidates
            .iter()
            .filter(|version| regex.is_match(&version.to_string()))
            .cloned()
            .collect();
        return latest(&matched).ok_or_else(|| TfenvError::NoRegexMatch {
            pattern: pattern.to_string(),
        });
    }

    Ok(Version::parse(spec, ctx.product)?)
}

#[async_trait]
impl VersionSource for TfenvSource {
    fn name(&self) -> &'static str {
        ".terraform-version file"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let path = ctx.module_dir.join(".terraform-version");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Ok(DiscoveryResult::Absent);
        };

        match parse_tfenv(&contents, candidates, ctx) {
            Ok(version) => Ok(DiscoveryResult::Version(version)),
            Err(error) => {
                log::debug!("ignoring {}: {error}", path.display());
                Ok(DiscoveryResult::Absent)
            }
        }
    }
}
