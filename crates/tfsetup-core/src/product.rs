use std::fmt;

use serde::{Deserialize, Serialize};

/// The toolchain a version belongs to.
///
/// Both products share the same version-number grammar. OpenTofu additionally
/// accepts Terraform's pre-1.6.0 release stream as valid candidates, which is
/// handled when the candidate pool is assembled, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Terraform,
    OpenTofu,
}

impl Product {
    /// Name of the executable inside a release archive.
    #[must_use]
    pub fn executable_name(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::OpenTofu => "tofu",
        }
    }

    /// Prefix used in archive and checksum file names,
    /// e.g. `terraform_1.5.7_linux_amd64.zip`.
    #[must_use]
    pub fn archive_prefix(self) -> &'static str {
        match self {
            Self::Terraform => "terraform",
            Self::OpenTofu => "tofu",
        }
    }

    /// The environment variable holding a version constraint for this product.
    #[must_use]
    pub fn version_env(self) -> &'static str {
        match self {
            Self::Terraform => "TERRAFORM_VERSION",
            Self::OpenTofu => "OPENTOFU_VERSION",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terraform => write!(f, "Terraform"),
            Self::OpenTofu => write!(f, "OpenTofu"),
        }
    }
}
