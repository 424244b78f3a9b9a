//! Candidate pool assembly from the upstream release listings.

use tfsetup_core::{Product, Version};
use tfsetup_opentofu::OpenTofuReleases;
use tfsetup_terraform::TerraformReleases;

#[derive(Debug, thiserror::Error)]
pub enum CandidatesError {
    #[error(transparent)]
    Terraform(#[from] tfsetup_terraform::ReleasesError),
    #[error(transparent)]
    OpenTofu(#[from] tfsetup_opentofu::ReleasesError),
}

/// Fetch the candidate pool for the given product.
///
/// Resolving for OpenTofu also fetches the Terraform listing (concurrently)
/// because OpenTofu accepts Terraform's pre-1.6.0 release stream as valid
/// candidates.
///
/// # Errors
/// Fails when a required release listing cannot be fetched.
pub async fn assemble_candidates(
    terraform: &TerraformReleases,
    opentofu: &OpenTofuReleases,
    product: Product,
) -> Result<Vec<Version>, CandidatesError> {
    match product {
        Product::Terraform => Ok(terraform.list_versions().await?),
        Product::OpenTofu => {
            let (terraform_versions, opentofu_versions) =
                tokio::join!(terraform.list_versions(), opentofu.list_versions());
            Ok(merge_for_opentofu(terraform_versions?, opentofu_versions?))
        }
    }
}

/// The OpenTofu candidate pool: Terraform releases capped below 1.6.0 (the
/// license split), with the OpenTofu release stream appended.
#[must_use]
pub fn merge_for_opentofu(
    terraform_versions: Vec<Version>,
    opentofu_versions: Vec<Version>,
) -> Vec<Version> {
    let cap = Version::new(1, 6, 0, Product::Terraform);
    let mut pool: Vec<Version> = terraform_versions
        .into_iter()
        .filter(|version| *version < cap)
        .collect();
    pool.extend(opentofu_versions);
    pool
}
