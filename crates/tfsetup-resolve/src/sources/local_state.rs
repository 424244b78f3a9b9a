use async_trait::async_trait;
use serde::Deserialize;

use tfsetup_core::{DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource};

/// Stage 8: an existing local `terraform.tfstate`.
///
/// A state file that has actually been written to (`serial > 0`) records the
/// version that wrote it, which is authoritative for a local backend.
pub struct LocalStateSource;

#[derive(Debug, Deserialize)]
struct LocalState {
    #[serde(default)]
    serial: u64,
    terraform_version: Option<String>,
}

#[async_trait]
impl VersionSource for LocalStateSource {
    fn name(&self) -> &'static str {
        "local terraform.tfstate"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        _candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        if ctx.facts.backend_type() != "local" || ctx.facts.uses_cloud_backend() {
            return Ok(DiscoveryResult::Absent);
        }

        let path = ctx.module_dir.join("terraform.tfstate");
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Ok(DiscoveryResult::Absent);
        };

        let state: LocalState = match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(error) => {
                log::debug!("ignoring {}: {error}", path.display());
                return Ok(DiscoveryResult::Absent);
            }
        };

        if state.serial == 0 {
            return Ok(DiscoveryResult::Absent);
        }
        let Some(writer) = state.terraform_version else {
            return Ok(DiscoveryResult::Absent);
        };

        match Version::parse(&writer, ctx.product) {
            Ok(version) => Ok(DiscoveryResult::Version(version)),
            Err(error) => {
                log::debug!("ignoring state writer version {writer:?}: {error}");
                Ok(DiscoveryResult::Absent)
            }
        }
    }
}
