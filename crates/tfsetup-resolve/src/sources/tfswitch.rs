use async_trait::async_trait;

use tfsetup_core::{DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource};

/// Stage 3: a tfswitch `.tfswitchrc` file in the module directory.
///
/// The file holds exactly one literal version; no `latest` forms.
pub struct TfswitchSource;

#[async_trait]
impl VersionSource for TfswitchSource {
    fn name(&self) -> &'static str {
        ".tfswitchrc file"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        _candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let path = ctx.module_dir.join(".tfswitchrc");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Ok(DiscoveryResult::Absent);
        };

        match Version::parse(contents.trim(), ctx.product) {
            Ok(version) => Ok(DiscoveryResult::Version(version)),
            Err(error) => {
                log::debug!("ignoring {}: {error}", path.display());
                Ok(DiscoveryResult::Absent)
            }
        }
    }
}
