use std::path::Path;

use async_trait::async_trait;

use tfsetup_core::{
    DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource, latest_non_prerelease,
};

/// Stage 5: an asdf `.tool-versions` file.
///
/// The file is searched for in the module directory and every ancestor,
/// stopping strictly before the workspace root: the root's own file belongs
/// to the repository, not the module.
pub struct AsdfSource;

fn parse_tool_versions(
    contents: &str,
    candidates: &[Version],
    ctx: &ResolveContext,
) -> Option<Version> {
    for line in contents.lines() {
        let line = line.trim();
        let mut fields = line.split_whitespace();
        if fields.next() != Some("terraform") {
            continue;
        }
        let Some(spec) = fields.next().filter(|field| !field.starts_with('#')) else {
            continue;
        };

        if spec == "latest" {
            return latest_non_prerelease(candidates);
        }
        return match Version::parse(spec, ctx.product) {
            Ok(version) => Some(version),
            Err(error) => {
                log::debug!("ignoring terraform entry {spec:?} in .tool-versions: {error}");
                None
            }
        };
    }

    None
}

#[async_trait]
impl VersionSource for AsdfSource {
    fn name(&self) -> &'static str {
        ".tool-versions file"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let mut dir: &Path = &ctx.module_dir;

        loop {
            if dir == ctx.workspace_root || dir == Path::new("/") {
                return Ok(DiscoveryResult::Absent);
            }

            let path = dir.join(".tool-versions");
            if let Ok(contents) = std::fs::read_to_string(&path) {
                if let Some(version) = parse_tool_versions(&contents, candidates, ctx) {
                    return Ok(DiscoveryResult::Version(version));
                }
                log::debug!("no usable terraform entry in {}", path.display());
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => return Ok(DiscoveryResult::Absent),
            }
        }
    }
}
