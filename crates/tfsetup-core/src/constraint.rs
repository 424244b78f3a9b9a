use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserialize, Deserializer};

use crate::version::{Version, cmp_pre_release};

/// A version constraint operator.
///
/// `Tilde` is the pessimistic operator `~>`, which pins all but the last
/// specified component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Tilde,
}

impl ConstraintOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Tilde => "~>",
        }
    }

    /// Deterministic sort rank: `< <= = ~> >= >`. `!=` sorts with `=`.
    fn precedence(self) -> u8 {
        match self {
            Self::Lt => 0,
            Self::Le => 1,
            Self::Eq | Self::Ne => 2,
            Self::Tilde => 3,
            Self::Ge => 4,
            Self::Gt => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintParseError {
    #[error("Invalid constraint operator in {input:?}")]
    InvalidOperator { input: String },
    #[error("Invalid version constraint {input:?}")]
    InvalidVersion { input: String },
}

/// A version constraint: an operator plus a partial version.
///
/// Unspecified minor/patch components are treated as 0 for comparison but are
/// excluded from the `~>` pinned prefix: `~>1.2` allows `>=1.2.0,<2.0.0`
/// while `~>1.2.3` allows `>=1.2.3,<1.3.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub op: ConstraintOp,
    pub major: u32,
    pub minor: Option<u32>,
    pub patch: Option<u32>,
    pub pre_release: String,
}

impl Constraint {
    #[must_use]
    pub fn exact(version: &Version) -> Self {
        Self {
            op: ConstraintOp::Eq,
            major: version.major,
            minor: Some(version.minor),
            patch: Some(version.patch),
            pre_release: version.pre_release.clone(),
        }
    }

    #[must_use]
    pub fn not(version: &Version) -> Self {
        Self {
            op: ConstraintOp::Ne,
            ..Self::exact(version)
        }
    }

    /// Compare a candidate version against this constraint's version fields.
    /// Unspecified components count as 0; pre-release text compares as plain
    /// bytes.
    fn compare(&self, version: &Version) -> Ordering {
        version
            .major
            .cmp(&self.major)
            .then(version.minor.cmp(&self.minor.unwrap_or(0)))
            .then(version.patch.cmp(&self.patch.unwrap_or(0)))
            .then_with(|| version.pre_release.cmp(&self.pre_release))
    }

    /// Is the given version allowed by this constraint?
    ///
    /// Pre-release versions are opt-in only: every operator except exact `=`
    /// refuses them regardless of the numeric comparison.
    #[must_use]
    pub fn allows(&self, version: &Version) -> bool {
        let ordering = self.compare(version);

        match self.op {
            ConstraintOp::Eq => ordering == Ordering::Equal,
            ConstraintOp::Ne => ordering != Ordering::Equal && !version.is_pre_release(),
            ConstraintOp::Gt => ordering == Ordering::Greater && !version.is_pre_release(),
            ConstraintOp::Ge => ordering != Ordering::Less && !version.is_pre_release(),
            ConstraintOp::Lt => ordering == Ordering::Less && !version.is_pre_release(),
            ConstraintOp::Le => ordering != Ordering::Greater && !version.is_pre_release(),
            ConstraintOp::Tilde => {
                if version.is_pre_release() {
                    return false;
                }
                match (self.minor, self.patch) {
                    // ~> x
                    (None, _) => version.major >= self.major,
                    // ~> x.y
                    (Some(minor), None) => {
                        version.major == self.major && version.minor >= minor
                    }
                    // ~> x.y.z
                    (Some(minor), Some(patch)) => {
                        version.major == self.major
                            && version.minor == minor
                            && version.patch >= patch
                    }
                }
            }
        }
    }
}

impl Ord for Constraint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.unwrap_or(0).cmp(&other.minor.unwrap_or(0)))
            .then(self.patch.unwrap_or(0).cmp(&other.patch.unwrap_or(0)))
            .then_with(|| cmp_pre_release(&self.pre_release, &other.pre_release))
            .then(self.op.precedence().cmp(&other.op.precedence()))
            // distinguish unspecified components from explicit zeros so the
            // order stays consistent with equality
            .then(self.minor.is_some().cmp(&other.minor.is_some()))
            .then(self.patch.is_some().cmp(&other.patch.is_some()))
            .then((self.op == ConstraintOp::Ne).cmp(&(other.op == ConstraintOp::Ne)))
    }
}

impl PartialOrd for Constraint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.major)?;
        if let Some(minor) = self.minor {
            write!(f, ".{minor}")?;
        }
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        }
        if !self.pre_release.is_empty() {
            write!(f, "-{}", self.pre_release)?;
        }
        Ok(())
    }
}

impl FromStr for Constraint {
    type Err = ConstraintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Terraform allows arbitrary spaces inside a constraint ("~> 1.2").
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        let operator_len = compact
            .find(|c: char| !matches!(c, '=' | '!' | '<' | '>' | '~'))
            .unwrap_or(compact.len());
        let (operator, rest) = compact.split_at(operator_len);

        let op = match operator {
            "" | "=" => ConstraintOp::Eq,
            "!=" => ConstraintOp::Ne,
            ">" => ConstraintOp::Gt,
            ">=" => ConstraintOp::Ge,
            "<" => ConstraintOp::Lt,
            "<=" => ConstraintOp::Le,
            "~>" => ConstraintOp::Tilde,
            _ => {
                return Err(ConstraintParseError::InvalidOperator {
                    input: s.to_string(),
                });
            }
        };

        let rest = rest.strip_prefix('v').unwrap_or(rest);
        let (numeric, pre_release) = match rest.split_once('-') {
            Some((numeric, pre)) => (numeric, pre),
            None => (rest, ""),
        };

        let invalid = || ConstraintParseError::InvalidVersion {
            input: s.to_string(),
        };

        let mut parts = numeric.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .map(|p| p.parse().map_err(|_| invalid()))
            .transpose()?;
        let patch = parts
            .next()
            .map(|p| p.parse().map_err(|_| invalid()))
            .transpose()?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            op,
            major,
            minor,
            patch,
            pre_release: pre_release.to_string(),
        })
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Keep only the versions allowed by every constraint in the set.
#[must_use]
pub fn apply_constraints(versions: &[Version], constraints: &[Constraint]) -> Vec<Version> {
    versions
        .iter()
        .filter(|v| constraints.iter().all(|c| c.allows(v)))
        .cloned()
        .collect()
}
