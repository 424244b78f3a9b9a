use async_trait::async_trait;

use tfsetup_core::{
    DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource, latest_non_prerelease,
};

use crate::cloud::{CloudClient, WorkspaceNaming, cloud_backend_config, full_workspace_name};

/// Stage 1: the version configured on a Terraform Cloud/Enterprise
/// workspace.
///
/// A pinned workspace version is authoritative, so a pin that cannot be
/// parsed is fatal. Everything environmental (no credentials, network
/// trouble, no such workspace) just means the signal is absent.
pub struct RemoteWorkspaceSource {
    cloud: CloudClient,
}

impl RemoteWorkspaceSource {
    #[must_use]
    pub fn new(cloud: CloudClient) -> Self {
        Self { cloud }
    }
}

#[async_trait]
impl VersionSource for RemoteWorkspaceSource {
    fn name(&self) -> &'static str {
        "remote workspace"
    }

    async fn attempt(
        &self,
        ctx: &ResolveContext,
        candidates: &[Version],
    ) -> Result<DiscoveryResult, ResolveError> {
        let Some(config) = cloud_backend_config(ctx) else {
            return Ok(DiscoveryResult::Absent);
        };
        let Some(organization) = config.organization else {
            log::debug!("cloud backend has no organization; skipping workspace lookup");
            return Ok(DiscoveryResult::Absent);
        };
        let Some(token) = config.token else {
            log::debug!("no credentials for {}; skipping workspace lookup", config.hostname);
            return Ok(DiscoveryResult::Absent);
        };

        let full_name = full_workspace_name(&config.workspaces, &ctx.workspace)?;

        let attributes = match self
            .cloud
            .get_workspace(&config.hostname, &token, &organization, &full_name)
            .await
        {
            Ok(Some(attributes)) => attributes,
            Ok(None) => return Ok(DiscoveryResult::Absent),
            Err(error) => {
                log::debug!("failed to get version from remote workspace: {error}");
                return Ok(DiscoveryResult::Absent);
            }
        };

        if let WorkspaceNaming::Tags(tags) = &config.workspaces {
            if !tags.iter().all(|tag| attributes.tag_names.contains(tag)) {
                log::debug!("workspace {full_name} does not carry the configured tags");
                return Ok(DiscoveryResult::Absent);
            }
        }

        match attributes.terraform_version.as_deref() {
            None => Ok(DiscoveryResult::Absent),
            Some("latest") => Ok(latest_non_prerelease(candidates)
                .map_or(DiscoveryResult::Absent, DiscoveryResult::Version)),
            Some(pinned) => {
                let version = Version::parse(pinned, ctx.product).map_err(|source| {
                    ResolveError::WorkspacePin {
                        value: pinned.to_string(),
                        source,
                    }
                })?;
                Ok(DiscoveryResult::Version(version))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfsetup_core::ModuleFacts;

    fn source() -> RemoteWorkspaceSource {
        RemoteWorkspaceSource::new(CloudClient::new(reqwest::Client::new()))
    }

    #[tokio::test]
    async fn absent_without_any_cloud_configuration() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{"backend_type": "s3", "backend_config": {"bucket": "b"}}"#,
        )
        .expect("valid facts in test");
        let ctx = ResolveContext::new(facts, "/srv/module");

        let result = source()
            .attempt(&ctx, &[])
            .await
            .expect("no cloud config is not an error");
        assert_eq!(result, DiscoveryResult::Absent);
    }

    #[tokio::test]
    async fn absent_without_credentials() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{
                "backend_type": "remote",
                "backend_config": {
                    "organization": "acme",
                    "workspaces": [{"name": "default"}]
                }
            }"#,
        )
        .expect("valid facts in test");
        let ctx = ResolveContext::new(facts, "/srv/module");

        let result = source()
            .attempt(&ctx, &[])
            .await
            .expect("missing token is not an error");
        assert_eq!(result, DiscoveryResult::Absent);
    }

    #[tokio::test]
    async fn mismatched_configured_name_is_fatal() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{
                "backend_type": "remote",
                "backend_config": {
                    "organization": "acme",
                    "token": "tok",
                    "workspaces": [{"name": "prod"}]
                }
            }"#,
        )
        .expect("valid facts in test");
        let mut ctx = ResolveContext::new(facts, "/srv/module");
        ctx.workspace = "staging".to_string();

        let error = source()
            .attempt(&ctx, &[])
            .await
            .expect_err("name mismatch is a configuration bug");
        assert!(matches!(error, ResolveError::WorkspaceMismatch { .. }));
    }
}
