use crate::version::VersionParseError;

/// Fatal resolution failures.
///
/// Discovery stages that merely find nothing report that through
/// [`crate::DiscoveryResult::Absent`]; these errors are reserved for explicit,
/// authoritative signals that contradict the available versions, which the
/// user has to fix in their configuration.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("no versions match the {origin} constraints {constraints}")]
    NoMatchingVersions {
        origin: &'static str,
        constraints: String,
    },

    #[error("no eligible versions remain after applying all constraints")]
    NoEligibleVersions,

    #[error("remote workspace pins invalid version {value:?}: {source}")]
    WorkspacePin {
        value: String,
        #[source]
        source: VersionParseError,
    },

    #[error(
        "only the configured workspace name {configured:?} can be used, not {requested:?}"
    )]
    WorkspaceMismatch {
        configured: String,
        requested: String,
    },
}

#[cfg(test)]
mod tests {
    use super::ResolveError;

    #[test]
    fn no_matching_versions_names_the_offending_constraints() {
        let error = ResolveError::NoMatchingVersions {
            origin: "required_version",
            constraints: "~>9.0".to_string(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("required_version"));
        assert!(rendered.contains("~>9.0"));
    }
}
