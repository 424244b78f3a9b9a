use async_trait::async_trait;

use tfsetup_core::{
    DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource, apply_constraints,
    latest,
};

/// Stage 2: the module's declared `required_version` constraints.
///
/// A declared constraint that matches no available version is a hard
/// failure: the user wrote an explicit directive that cannot be satisfied.
pub struct RequiredVersionSource;

#[async_trait]
impl VersionSource for RequiredVersionSource {
    fn name(&self) -> &'static str {
        "required_version"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let constraints = &ctx.facts.required_version;
        if constraints.is_empty() {
            return Ok(DiscoveryResult::Absent);
        }

        let matching = apply_constraints(candidates, constraints);
        let Some(version) = latest(&matching) else {
            return Err(ResolveError::NoMatchingVersions {
                origin: "required_version",
                constraints: render(constraints),
            });
        };

        Ok(DiscoveryResult::Version(version))
    }
}

fn render(constraints: &[tfsetup_core::Constraint]) -> String {
    constraints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
