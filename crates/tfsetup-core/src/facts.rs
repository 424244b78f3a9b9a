use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::constraint::Constraint;

/// Facts about a configuration module, as produced by the external
/// configuration parser.
///
/// This is plain data: the engine never reads `.tf` files itself, it only
/// consumes this structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleFacts {
    /// `required_version` constraints declared by the module.
    pub required_version: Vec<Constraint>,
    /// The type of the configured state backend, if any backend block exists.
    pub backend_type: Option<String>,
    /// The backend block's configuration. Nested one-level blocks (such as
    /// `assume_role`) appear as arrays of objects.
    pub backend_config: Map<String, Value>,
    /// The `cloud` block configuration, if present.
    pub cloud_config: Option<Map<String, Value>>,
    /// Names of variables the module marks as sensitive.
    pub sensitive_variables: BTreeSet<String>,
}

impl ModuleFacts {
    /// The effective backend type; a module without a backend block stores
    /// state locally.
    #[must_use]
    pub fn backend_type(&self) -> &str {
        self.backend_type.as_deref().unwrap_or("local")
    }

    /// Whether this module uses a Terraform Cloud style backend, either via
    /// a `remote` backend block or a `cloud` block.
    #[must_use]
    pub fn uses_cloud_backend(&self) -> bool {
        self.cloud_config.is_some() || matches!(self.backend_type(), "remote" | "cloud")
    }
}

#[cfg(test)]
mod tests {
    use super::ModuleFacts;

    #[test]
    fn backend_type_defaults_to_local() {
        let facts = ModuleFacts::default();
        assert_eq!(facts.backend_type(), "local");
        assert!(!facts.uses_cloud_backend());
    }

    #[test]
    fn deserializes_from_parser_output() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{
                "required_version": ["~> 1.5"],
                "backend_type": "s3",
                "backend_config": {
                    "bucket": "state-bucket",
                    "key": "env/prod.tfstate",
                    "region": "eu-west-2"
                },
                "sensitive_variables": ["db_password"]
            }"#,
        )
        .expect("valid module facts document");

        assert_eq!(facts.required_version.len(), 1);
        assert_eq!(facts.backend_type(), "s3");
        assert_eq!(
            facts.backend_config.get("bucket").and_then(|v| v.as_str()),
            Some("state-bucket")
        );
        assert!(facts.sensitive_variables.contains("db_password"));
        assert!(!facts.uses_cloud_backend());
    }

    #[test]
    fn cloud_block_marks_module_as_cloud_backed() {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{"cloud_config": {"organization": "acme", "workspaces": {"name": "prod"}}}"#,
        )
        .expect("valid module facts document");

        assert!(facts.uses_cloud_backend());
        assert_eq!(facts.backend_type(), "local");
    }

    #[test]
    fn invalid_required_version_is_a_parse_error() {
        let result: Result<ModuleFacts, _> =
            serde_json::from_str(r#"{"required_version": ["=>nonsense"]}"#);
        assert!(result.is_err());
    }
}
