use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::constraint::Constraint;
use crate::error::ResolveError;
use crate::facts::ModuleFacts;
use crate::product::Product;
use crate::version::Version;

/// What one discovery stage learned from its signal source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryResult {
    /// A definite answer; resolution stops here.
    Version(Version),
    /// The signal narrows the candidate pool but does not pick a version.
    Constraints(Vec<Constraint>),
    /// The signal is not present; try the next stage.
    Absent,
}

/// Everything a discovery stage may consult, assembled once per resolution.
///
/// The environment is carried as a snapshot so stages never read process
/// globals directly.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    pub facts: ModuleFacts,
    pub module_dir: PathBuf,
    pub workspace: String,
    /// The CI checkout root; the asdf file search stops at this boundary.
    pub workspace_root: PathBuf,
    /// Backend configuration overrides supplied outside the module
    /// (`key=value` entries).
    pub backend_config_vars: BTreeMap<String, String>,
    /// Paths of extra backend configuration files supplied outside the module.
    pub backend_config_files: Vec<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub product: Product,
}

impl ResolveContext {
    #[must_use]
    pub fn new(facts: ModuleFacts, module_dir: impl Into<PathBuf>) -> Self {
        Self {
            facts,
            module_dir: module_dir.into(),
            workspace: "default".to_string(),
            workspace_root: PathBuf::from("/"),
            backend_config_vars: BTreeMap::new(),
            backend_config_files: Vec::new(),
            env: BTreeMap::new(),
            product: Product::Terraform,
        }
    }

    #[must_use]
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}

/// One independent strategy for learning the desired toolchain version.
///
/// Implementations swallow their own internal errors (logging them and
/// reporting [`DiscoveryResult::Absent`]) except where the signal is
/// unambiguous and wrong, which is a [`ResolveError`].
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short name used in audit logging, e.g. `".terraform-version file"`.
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(DiscoveryResult);

    #[async_trait]
    impl VersionSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn attempt(
            &self,
            _ctx: &ResolveContext,
            _candidates: &[Version],
        ) -> Result<DiscoveryResult, ResolveError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn sources_are_usable_as_trait_objects() {
        let source: Box<dyn VersionSource> = Box::new(FixedSource(DiscoveryResult::Absent));
        let ctx = ResolveContext::new(ModuleFacts::default(), "/tmp/module");

        let result = source
            .attempt(&ctx, &[])
            .await
            .expect("fixed source never fails");
        assert_eq!(result, DiscoveryResult::Absent);
        assert_eq!(source.name(), "fixed");
    }

    #[test]
    fn context_defaults() {
        let ctx = ResolveContext::new(ModuleFacts::default(), "/srv/module");
        assert_eq!(ctx.workspace, "default");
        assert_eq!(ctx.product, Product::Terraform);
        assert_eq!(ctx.env("UNSET"), None);
    }
}
