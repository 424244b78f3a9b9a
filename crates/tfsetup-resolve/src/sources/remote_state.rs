use async_trait::async_trait;

use tfsetup_core::{DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource};

use crate::guess::StateGuesser;

/// Stage 9: guess the version that wrote an existing remote state file by
/// probing candidate binaries against it.
///
/// Only applies to real remote backends; `local` state is read directly and
/// `remote`/`cloud` workspaces report their version through stage 1.
pub struct RemoteStateSource {
    guesser: StateGuesser,
}

impl RemoteStateSource {
    #[must_use]
    pub fn new(guesser: StateGuesser) -> Self {
        Self { guesser }
    }
}

#[async_trait]
impl VersionSource for RemoteStateSource {
    fn name(&self) -> &'static str {
        "remote state"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        if ctx.facts.backend_type() == "local" || ctx.facts.uses_cloud_backend() {
            return Ok(DiscoveryResult::Absent);
        }

        match self.guesser.guess(ctx, candidates).await {
            Some(version) => Ok(DiscoveryResult::Version(version)),
            None => Ok(DiscoveryResult::Absent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guess::{ProbeOutcome, StateProbe};
    use tfsetup_core::ModuleFacts;

    struct AnswerProbe(Version);

    #[async_trait]
    impl StateProbe for AnswerProbe {
        async fn probe(
            &self,
            _version: &Version,
            _ctx: &ResolveContext,
            _backend_hcl: &str,
        ) -> ProbeOutcome {
            ProbeOutcome::WriterVersion(self.0.clone())
        }
    }

    fn source(answer: &str) -> RemoteStateSource {
        RemoteStateSource::new(StateGuesser::new(Box::new(AnswerProbe(
            answer.parse().expect("valid version in test"),
        ))))
    }

    fn candidates() -> Vec<Version> {
        vec!["1.5.7".parse().expect("valid version in test")]
    }

    #[tokio::test]
    async fn cloud_and_local_backends_are_never_probed() {
        let local = ResolveContext::new(ModuleFacts::default(), "/srv/module");
        let result = source("1.0.0")
            .attempt(&local, &candidates())
            .await
            .expect("gating is not an error");
        assert_eq!(result, DiscoveryResult::Absent);

        let facts: ModuleFacts = serde_json::from_str(
            r#"{"backend_type": "remote", "backend_config": {"organization": "acme"}}"#,
        )
        .expect("valid facts in test");
        let remote = ResolveContext::new(facts, "/srv/module");
        let result = source("1.0.0")
            .attempt(&remote, &candidates())
            .await
            .expect("gating is not an error");
        assert_eq!(result, DiscoveryResult::Absent);
    }

    #[tokio::test]
    async fn real_remote_backend_drives_the_guesser() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{"backend_type": "s3", "backend_config": {"bucket": "b", "key": "k"}}"#,
        )
        .expect("valid facts in test");
        let ctx = ResolveContext::new(facts, "/srv/module");

        let result = source("1.2.3")
            .attempt(&ctx, &candidates())
            .await
            .expect("probing is not an error");
        assert_eq!(
            result,
            DiscoveryResult::Version("1.2.3".parse().expect("valid version"))
        );
    }
}
