use async_trait::async_trait;

use tfsetup_core::{
    Constraint, DiscoveryResult, Product, ResolveContext, ResolveError, Version, VersionSource,
    apply_constraints, latest_non_prerelease,
};

/// Stage 6: the product's version-constraint environment variable
/// (`TERRAFORM_VERSION` / `OPENTOFU_VERSION`), a comma-separated constraint
/// list.
///
/// Unlike a declared `required_version`, this is a soft signal: a value that
/// matches nothing is logged and skipped, not fatal.
pub struct EnvConstraintSource;

#[async_trait]
impl VersionSource for EnvConstraintSource {
    fn name(&self) -> &'static str {
        "version environment variable"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let key = ctx.product.version_env();
        let Some(raw) = ctx.env(key) else {
            // the terraform-named variable doubles as the legacy spelling
            // when resolving OpenTofu
            if ctx.product == Product::OpenTofu {
                if let Some(raw) = ctx.env(Product::Terraform.version_env()) {
                    return Ok(self.apply(raw, "TERRAFORM_VERSION", candidates));
                }
            }
            return Ok(DiscoveryResult::Absent);
        };

        Ok(self.apply(raw, key, candidates))
    }
}

impl EnvConstraintSource {
    fn apply(&self, raw: &str, key: &str, candidates: &[Version]) -> DiscoveryResult {
        let constraints: Result<Vec<Constraint>, _> =
            raw.split(',').map(str::parse).collect();
        let constraints = match constraints {
            Ok(constraints) => constraints,
            Err(error) => {
                log::debug!("ignoring {key}={raw:?}: {error}");
                return DiscoveryResult::Absent;
            }
        };

        let matching = apply_constraints(candidates, &constraints);
        match latest_non_prerelease(&matching) {
            Some(version) => DiscoveryResult::Version(version),
            None => {
                log::info!("no versions match the {key} constraints {raw}");
                DiscoveryResult::Absent
            }
        }
    }
}
