use async_trait::async_trait;

use tfsetup_core::{
    Constraint, DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource,
};
use tfsetup_platform::HostPlatform;

use crate::backends::backend_constraints;

/// Stage 7: constraints implied by the backend configuration.
///
/// This stage never picks a version; it narrows the pool so the remaining
/// stages (state probing, fallback) only consider versions that can actually
/// `init` this backend. It runs even when no earlier declarative stage
/// matched.
pub struct BackendConstraintsSource {
    platform: HostPlatform,
}

impl BackendConstraintsSource {
    #[must_use]
    pub fn new(platform: HostPlatform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl VersionSource for BackendConstraintsSource {
    fn name(&self) -> &'static str {
        "backend configuration"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        _candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let config_keys = ctx
            .facts
            .backend_config
            .keys()
            .map(String::as_str)
            .chain(ctx.backend_config_vars.keys().map(String::as_str));

        let mut constraints =
            backend_constraints(ctx.facts.backend_type(), config_keys, &ctx.env);

        // Supplying backend config as key=value overrides at all requires the
        // string form of -backend-config.
        if !ctx.backend_config_vars.is_empty() {
            constraints.extend(">=0.9.1".parse::<Constraint>());
        }

        // arm64 builds only exist from 0.13.5.
        if self.platform.is_arm64() {
            constraints.extend(">=0.13.5".parse::<Constraint>());
        }

        if constraints.is_empty() {
            return Ok(DiscoveryResult::Absent);
        }

        constraints.sort();
        constraints.dedup();
        Ok(DiscoveryResult::Constraints(constraints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfsetup_core::ModuleFacts;

    fn amd64() -> HostPlatform {
        HostPlatform::from_labels("linux", "amd64").expect("known platform")
    }

    fn arm64() -> HostPlatform {
        HostPlatform::from_labels("linux", "arm64").expect("known platform")
    }

    fn ctx(facts_json: &str) -> ResolveContext {
        let facts: ModuleFacts = serde_json::from_str(facts_json).expect("valid facts in test");
        ResolveContext::new(facts, "/srv/module")
    }

    fn rendered(result: &DiscoveryResult) -> Vec<String> {
        match result {
            DiscoveryResult::Constraints(constraints) => {
                constraints.iter().map(ToString::to_string).collect()
            }
            other => panic!("expected constraints, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn s3_backend_implies_its_introduction_floor() {
        let result = BackendConstraintsSource::new(amd64())
            .attempt(
                &ctx(
                    r#"{
                        "backend_type": "s3",
                        "backend_config": {"bucket": "b", "key": "k", "region": "r"}
                    }"#,
                ),
                &[],
            )
            .await
            .expect("table lookup is not an error");

        assert!(rendered(&result).contains(&">=0.9.0".to_string()));
    }

    #[tokio::test]
    async fn local_backend_implies_nothing_on_amd64() {
        let result = BackendConstraintsSource::new(amd64())
            .attempt(&ctx("{}"), &[])
            .await
            .expect("table lookup is not an error");
        assert_eq!(result, DiscoveryResult::Absent);
    }

    #[tokio::test]
    async fn arm64_hosts_require_arm64_builds() {
        let result = BackendConstraintsSource::new(arm64())
            .attempt(&ctx("{}"), &[])
            .await
            .expect("table lookup is not an error");
        assert_eq!(rendered(&result), vec![">=0.13.5".to_string()]);
    }

    #[tokio::test]
    async fn explicit_backend_config_vars_imply_the_string_form() {
        let mut context = ctx(
            r#"{"backend_type": "s3", "backend_config": {"bucket": "b"}}"#,
        );
        context
            .backend_config_vars
            .insert("key".to_string(), "prod.tfstate".to_string());

        let result = BackendConstraintsSource::new(amd64())
            .attempt(&context, &[])
            .await
            .expect("table lookup is not an error");
        assert!(rendered(&result).contains(&">=0.9.1".to_string()));
    }

    #[tokio::test]
    async fn constraints_are_sorted_and_deduplicated() {
        let result = BackendConstraintsSource::new(amd64())
            .attempt(
                &ctx(
                    r#"{
                        "backend_type": "s3",
                        "backend_config": {"bucket": "b", "key": "k"}
                    }"#,
                ),
                &[],
            )
            .await
            .expect("table lookup is not an error");

        let texts = rendered(&result);
        let mut sorted = texts.clone();
        sorted.dedup();
        assert_eq!(texts, sorted);
    }
}
