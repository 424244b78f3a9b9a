use std::sync::Arc;

use tfsetup_core::{
    DiscoveryResult, ResolveContext, ResolveError, Version, VersionSource, apply_constraints,
    latest_non_prerelease,
};
use tfsetup_install::Installer;
use tfsetup_platform::HostPlatform;

use crate::cloud::CloudClient;
use crate::guess::{CommandProbe, StateGuesser};
use crate::sources::{
    AsdfSource, BackendConstraintsSource, EnvConstraintSource, LocalStateSource,
    RemoteStateSource, RemoteWorkspaceSource, RequiredVersionSource, TfenvSource, TfswitchSource,
};

/// The outcome of a resolution: the version to install and which discovery
/// stage produced it, for the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub version: Version,
    pub source: &'static str,
}

/// Runs the discovery source chain in priority order over a candidate pool.
///
/// A stage returning a version wins and everything after it is skipped; a
/// stage returning constraints narrows the pool for the stages after it; the
/// fallback is the latest non-pre-release of whatever remains.
pub struct Resolver {
    sources: Vec<Box<dyn VersionSource>>,
}

impl Resolver {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn VersionSource>>) -> Self {
        Self { sources }
    }

    /// The standard chain, stages 1 through 9.
    #[must_use]
    pub fn standard(
        http: &reqwest::Client,
        platform: HostPlatform,
        installer: Arc<Installer>,
    ) -> Self {
        Self::new(vec![
            Box::new(RemoteWorkspaceSource::new(CloudClient::new(http.clone()))),
            Box::new(RequiredVersionSource),
            Box::new(TfswitchSource),
            Box::new(TfenvSource),
            Box::new(AsdfSource),
            Box::new(EnvConstraintSource),
            Box::new(BackendConstraintsSource::new(platform)),
            Box::new(LocalStateSource),
            Box::new(RemoteStateSource::new(StateGuesser::new(Box::new(
                CommandProbe::new(installer),
            )))),
        ])
    }

    /// Resolve the version to use for the module described by `ctx`.
    ///
    /// # Errors
    /// Fails when an authoritative signal contradicts the available versions,
    /// or when every candidate has been constrained away.
    pub async fn resolve(
        &self,
        ctx: &ResolveContext,
        candidates: Vec<Version>,
    ) -> Result<Resolution, ResolveError> {
        let mut pool = candidates;

        for source in &self.sources {
            match source.attempt(ctx, &pool).await? {
                DiscoveryResult::Version(version) => {
                    log::info!(
                        "Using {} {version}, from the {}",
                        version.product,
                        source.name()
                    );
                    return Ok(Resolution {
                        version,
                        source: source.name(),
                    });
                }
                DiscoveryResult::Constraints(constraints) => {
                    let rendered = constraints
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    pool = apply_constraints(&pool, &constraints);
                    log::info!(
                        "The {} constrains the version to {rendered} ({} candidates remain)",
                        source.name(),
                        pool.len()
                    );
                }
                DiscoveryResult::Absent => {
                    log::debug!("No version from the {}", source.name());
                }
            }
        }

        let version = latest_non_prerelease(&pool).ok_or(ResolveError::NoEligibleVersions)?;
        log::info!("Version not specified; using the latest release {version}");
        Ok(Resolution {
            version,
            source: "latest release",
        })
    }
}
