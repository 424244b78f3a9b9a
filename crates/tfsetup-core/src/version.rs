use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::product::Product;

/// A toolchain version: numeric triple plus an optional pre-release suffix.
///
/// A release always outranks any pre-release of the same numeric triple, so
/// `1.2.0-rc1 < 1.2.0 < 1.3.0`. Two versions are equal only if every field
/// matches, including the product and the pre-release text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre_release: String,
    pub product: Product,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y.Z format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
    #[error("Invalid pre-release suffix: {value}")]
    InvalidPreRelease { value: String },
}

impl Version {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32, product: Product) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: String::new(),
            product,
        }
    }

    /// Parse a version string such as `1.5.7` or `v1.2.0-rc1` for the given
    /// product. A leading `v` is stripped before parsing.
    ///
    /// # Errors
    /// Returns an error when the input is not a full `X.Y.Z[-pre]` version.
    pub fn parse(input: &str, product: Product) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

        let (numeric, pre_release) = match trimmed.split_once('-') {
            Some((numeric, pre)) => (numeric, pre),
            None => (trimmed, ""),
        };

        if trimmed.contains('-')
            && (pre_release.is_empty()
                || !pre_release
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        {
            return Err(VersionParseError::InvalidPreRelease {
                value: pre_release.to_string(),
            });
        }

        let mut parts = numeric.split('.');
        let major = parse_component(&mut parts, VersionComponent::Major, trimmed)?;
        let minor = parse_component(&mut parts, VersionComponent::Minor, trimmed)?;
        let patch = parse_component(&mut parts, VersionComponent::Patch, trimmed)?;
        if parts.next().is_some() {
            return Err(VersionParseError::InvalidFormat {
                input: trimmed.to_string(),
            });
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre_release: pre_release.to_string(),
            product,
        })
    }

    #[must_use]
    pub fn is_pre_release(&self) -> bool {
        !self.pre_release.is_empty()
    }
}

fn parse_component<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    component: VersionComponent,
    input: &str,
) -> Result<u32, VersionParseError> {
    let part = parts.next().ok_or_else(|| VersionParseError::InvalidFormat {
        input: input.to_string(),
    })?;
    part.parse()
        .map_err(|_| VersionParseError::InvalidComponent {
            component,
            value: part.to_string(),
        })
}

/// Empty pre-release sorts after any non-empty one; otherwise plain byte order.
pub(crate) fn cmp_pre_release(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| cmp_pre_release(&self.pre_release, &other.pre_release))
            // product is the final tiebreaker so ordering stays consistent
            // with equality
            .then(self.product.cmp(&other.product))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre_release.is_empty() {
            write!(f, "-{}", self.pre_release)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, Product::Terraform)
    }
}

/// Latest version among the given versions, pre-releases included.
#[must_use]
pub fn latest(versions: &[Version]) -> Option<Version> {
    versions.iter().max().cloned()
}

/// Latest non-pre-release version among the given versions.
#[must_use]
pub fn latest_non_prerelease(versions: &[Version]) -> Option<Version> {
    versions
        .iter()
        .filter(|v| !v.is_pre_release())
        .max()
        .cloned()
}

/// Earliest version among the given versions, pre-releases included.
#[must_use]
pub fn earliest(versions: &[Version]) -> Option<Version> {
    versions.iter().min().cloned()
}

/// Earliest non-pre-release version among the given versions.
#[must_use]
pub fn earliest_non_prerelease(versions: &[Version]) -> Option<Version> {
    versions
        .iter()
        .filter(|v| !v.is_pre_release())
        .min()
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tf(s: &str) -> Version {
        s.parse().expect("valid version in test")
    }

    #[test]
    fn parse_plain_version() {
        let v = tf("1.5.7");
        assert_eq!((v.major, v.minor, v.patch), (1, 5, 7));
        assert!(v.pre_release.is_empty());
        assert_eq!(v.product, Product::Terraform);
    }

    #[test]
    fn parse_strips_leading_v_and_whitespace() {
        assert_eq!(tf("  v0.13.6  "), tf("0.13.6"));
    }

    #[test]
    fn parse_pre_release() {
        let v = tf("1.1.0-alpha20210811");
        assert_eq!(v.pre_release, "alpha20210811");
        assert!(v.is_pre_release());
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("1.5".parse::<Version>().is_err());
        assert!("1.5.7.0".parse::<Version>().is_err());
        assert!("blahblah".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
        assert!("1.x.0".parse::<Version>().is_err());
        assert!("1.2.0-".parse::<Version>().is_err());
        assert!("1.2.0-rc 1".parse::<Version>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["0.11.14", "1.5.7", "1.2.0-rc1"] {
            assert_eq!(tf(s).to_string(), s);
        }
    }

    #[test]
    fn release_outranks_pre_release_of_same_triple() {
        assert!(tf("1.2.0-rc1") < tf("1.2.0"));
        assert!(tf("1.2.0") < tf("1.3.0"));
        assert!(tf("1.2.0-alpha") < tf("1.2.0-rc1"));
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        assert!(tf("0.9.0") < tf("0.13.5"));
        assert!(tf("1.9.9") < tf("1.10.0"));
    }

    #[test]
    fn equality_includes_pre_release_and_product() {
        assert_ne!(tf("1.2.0"), tf("1.2.0-rc1"));
        assert_ne!(
            tf("1.6.0"),
            Version::parse("1.6.0", Product::OpenTofu).expect("valid version in test")
        );
    }

    #[test]
    fn latest_and_earliest_helpers() {
        let versions: Vec<Version> = ["1.4.9", "1.5.7", "1.6.0-beta1", "0.12.31"]
            .iter()
            .map(|s| tf(s))
            .collect();

        assert_eq!(latest(&versions), Some(tf("1.6.0-beta1")));
        assert_eq!(latest_non_prerelease(&versions), Some(tf("1.5.7")));
        assert_eq!(earliest(&versions), Some(tf("0.12.31")));
        assert_eq!(earliest_non_prerelease(&versions), Some(tf("0.12.31")));
    }

    #[test]
    fn helpers_return_none_when_nothing_qualifies() {
        assert_eq!(latest(&[]), None);
        let only_pre = vec![tf("1.0.0-rc1")];
        assert_eq!(latest_non_prerelease(&only_pre), None);
        assert_eq!(earliest_non_prerelease(&only_pre), None);
    }
}
