//! Static knowledge base about state backends.
//!
//! For each backend type this records the version constraints implied by
//! using it at all, by individual configuration keys, and by the environment
//! variables it honors - enough to pick a toolchain that can `init` the
//! backend and pull its state. The same table carries the curated,
//! operationally-relevant configuration surface per backend (the keys that
//! identify *which* state is used, as opposed to how it is accessed).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use tfsetup_core::Constraint;

pub struct BackendKnowledge {
    pub backend_type: &'static str,
    /// Constraints implied by the backend type itself.
    pub constraints: &'static [&'static str],
    /// Constraints implied by individual configuration keys, when set.
    pub key_constraints: &'static [(&'static str, &'static [&'static str])],
    /// Constraints implied by environment variables, when set.
    pub env_constraints: &'static [(&'static str, &'static [&'static str])],
    /// Configuration keys that identify the state location, each with the
    /// environment variables that can stand in for it.
    pub fingerprint: &'static [(&'static str, &'static [&'static str])],
}

/// Configurable backends existed from 0.9.0; several backends were removed
/// again in 1.3.
const SINCE_BACKENDS: &[&str] = &[">=0.9.0"];
const REMOVED_IN_1_3: &[&str] = &[">=0.9.0", "<=1.2.9"];

static BACKENDS: &[BackendKnowledge] = &[
    BackendKnowledge {
        backend_type: "s3",
        constraints: SINCE_BACKENDS,
        key_constraints: &[
            ("bucket", &[">=0.9.0"]),
            ("key", &[">=0.9.0"]),
            ("region", &[">=0.9.0"]),
            ("endpoint", &[">=0.9.0", "<=1.5.7"]),
            ("endpoints", &[">=1.6.0"]),
            ("dynamodb_table", &[">=0.10.0"]),
            ("workspace_key_prefix", &[">=0.10.4"]),
            ("role_arn", &[">=0.9.0", "<=1.5.7"]),
            ("assume_role", &[">=1.1.0"]),
            ("force_path_style", &[">=0.9.0", "<=1.5.7"]),
            ("use_path_style", &[">=1.6.0"]),
        ],
        env_constraints: &[("AWS_METADATA_URL", &[">=0.11.5"])],
        fingerprint: &[
            ("endpoint", &["AWS_S3_ENDPOINT"]),
            ("bucket", &[]),
            ("workspace_key_prefix", &[]),
            ("key", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "gcs",
        constraints: SINCE_BACKENDS,
        key_constraints: &[
            ("bucket", &[">=0.9.0"]),
            ("prefix", &[">=0.9.0"]),
            ("credentials", &[">=0.9.0"]),
            ("path", &[">=0.9.0", "<=0.14.11"]),
            ("region", &[">=0.11.0", "<=0.15.3"]),
            ("impersonate_service_account", &[">=0.14.0"]),
            ("access_token", &[">=0.12.14"]),
        ],
        env_constraints: &[(
            "GOOGLE_BACKEND_IMPERSONATE_SERVICE_ACCOUNT",
            &[">=0.14.0"],
        )],
        fingerprint: &[("bucket", &[]), ("prefix", &[])],
    },
    BackendKnowledge {
        backend_type: "azurerm",
        constraints: &[">=0.9.0"],
        key_constraints: &[
            ("storage_account_name", &[">=0.9.0"]),
            ("container_name", &[">=0.9.0"]),
            ("key", &[">=0.9.0"]),
            ("snapshot", &[">=0.12.21"]),
            ("msi_endpoint", &[">=0.12.0"]),
            ("use_microsoft_graph", &[">=1.0.0", "<=1.2.9"]),
            ("use_oidc", &[">=1.2.0"]),
        ],
        env_constraints: &[("ARM_USE_OIDC", &[">=1.2.0"])],
        fingerprint: &[
            ("storage_account_name", &[]),
            ("container_name", &[]),
            ("key", &[]),
            ("environment", &["ARM_ENVIRONMENT"]),
            ("endpoint", &["ARM_ENDPOINT"]),
            ("resource_group_name", &[]),
            ("msi_endpoint", &["ARM_MSI_ENDPOINT"]),
            ("subscription_id", &["ARM_SUBSCRIPTION_ID"]),
            ("tenant_id", &["ARM_TENANT_ID"]),
        ],
    },
    BackendKnowledge {
        backend_type: "remote",
        constraints: &[">=0.11.13"],
        key_constraints: &[],
        env_constraints: &[("TF_TOKEN_app_terraform_io", &[">=1.2.0"])],
        fingerprint: &[
            ("hostname", &[]),
            ("organization", &[]),
            ("workspaces", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "cloud",
        constraints: &[">=1.1.0"],
        key_constraints: &[],
        env_constraints: &[],
        fingerprint: &[
            ("hostname", &[]),
            ("organization", &[]),
            ("workspaces", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "consul",
        constraints: SINCE_BACKENDS,
        key_constraints: &[("gzip", &[">=0.9.4"]), ("lock", &[">=0.9.0"])],
        env_constraints: &[],
        fingerprint: &[("path", &[]), ("address", &["CONSUL_HTTP_ADDR"])],
    },
    BackendKnowledge {
        backend_type: "cos",
        constraints: &[">=0.13.0"],
        key_constraints: &[("accelerate", &[">=1.1.0"])],
        env_constraints: &[],
        fingerprint: &[
            ("bucket", &[]),
            ("prefix", &[]),
            ("key", &[]),
            ("region", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "http",
        constraints: SINCE_BACKENDS,
        key_constraints: &[
            ("lock_address", &[">=0.9.2"]),
            ("unlock_address", &[">=0.9.2"]),
            ("retry_max", &[">=0.11.8"]),
        ],
        env_constraints: &[
            ("TF_HTTP_ADDRESS", &[">=0.12.2"]),
            ("TF_HTTP_LOCK_ADDRESS", &[">=0.12.2"]),
            ("TF_HTTP_UNLOCK_ADDRESS", &[">=0.12.2"]),
        ],
        fingerprint: &[
            ("address", &["TF_HTTP_ADDRESS"]),
            ("lock_address", &["TF_HTTP_LOCK_ADDRESS"]),
            ("unlock_address", &["TF_HTTP_UNLOCK_ADDRESS"]),
        ],
    },
    BackendKnowledge {
        backend_type: "kubernetes",
        constraints: &[">=0.13.0"],
        key_constraints: &[],
        env_constraints: &[("KUBE_TOKEN", &[">=0.13.0"])],
        fingerprint: &[
            ("secret_suffix", &[]),
            ("namespace", &["KUBE_NAMESPACE"]),
            ("host", &["KUBE_HOST"]),
            ("config_path", &["KUBE_CONFIG_PATH"]),
            ("config_paths", &["KUBE_CONFIG_PATHS"]),
            ("context", &["KUBE_CTX"]),
        ],
    },
    BackendKnowledge {
        backend_type: "oss",
        constraints: &[">=0.12.2"],
        key_constraints: &[
            ("access_key", &[">=0.12.2"]),
            ("secret_key", &[">=0.12.2"]),
            ("bucket", &[">=0.12.2"]),
            ("prefix", &[">=0.12.2"]),
            ("key", &[">=0.12.2"]),
            ("assume_role", &[">=0.12.6"]),
            ("profile", &[">=0.12.8"]),
            ("sts_endpoint", &[">=0.12.14"]),
        ],
        env_constraints: &[("ALICLOUD_ASSUME_ROLE_ARN", &[">=0.12.6"])],
        fingerprint: &[
            ("region", &["ALICLOUD_REGION", "ALICLOUD_DEFAULT_REGION"]),
            ("endpoint", &["ALICLOUD_OSS_ENDPOINT", "OSS_ENDPOINT"]),
            ("bucket", &[]),
            ("prefix", &[]),
            ("key", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "pg",
        constraints: &[">=0.12.0"],
        key_constraints: &[
            ("skip_schema_creation", &[">=0.12.0"]),
            ("skip_table_creation", &[">=0.14.0"]),
            ("skip_index_creation", &[">=0.14.0"]),
        ],
        env_constraints: &[("PG_CONN_STR", &[">=0.14.0"])],
        fingerprint: &[("conn_str", &["PG_CONN_STR"]), ("schema_name", &[])],
    },
    BackendKnowledge {
        backend_type: "artifactory",
        constraints: REMOVED_IN_1_3,
        key_constraints: &[],
        env_constraints: &[],
        fingerprint: &[
            ("url", &["ARTIFACTORY_URL"]),
            ("repo", &[]),
            ("subpath", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "etcd",
        constraints: REMOVED_IN_1_3,
        key_constraints: &[],
        env_constraints: &[],
        fingerprint: &[("path", &[]), ("endpoints", &[])],
    },
    BackendKnowledge {
        backend_type: "etcdv3",
        constraints: &[">=0.11.0", "<=1.2.9"],
        key_constraints: &[("max_request_bytes", &[">=0.12.0"])],
        env_constraints: &[],
        fingerprint: &[("prefix", &[]), ("endpoints", &[])],
    },
    BackendKnowledge {
        backend_type: "manta",
        constraints: REMOVED_IN_1_3,
        key_constraints: &[],
        env_constraints: &[],
        fingerprint: &[
            ("account", &["SDC_ACCOUNT", "TRITON_ACCOUNT"]),
            ("url", &["MANTA_URL"]),
            ("path", &[]),
            ("object_name", &[]),
        ],
    },
    BackendKnowledge {
        backend_type: "swift",
        constraints: REMOVED_IN_1_3,
        key_constraints: &[("application_credential_id", &[">=0.12.8"])],
        env_constraints: &[("OS_APPLICATION_CREDENTIAL_ID", &[">=0.12.8"])],
        fingerprint: &[
            ("auth_url", &["OS_AUTH_URL"]),
            ("cloud", &["OS_CLOUD"]),
            ("region_name", &["OS_REGION_NAME"]),
            ("container", &[]),
            ("state_name", &[]),
            ("path", &[]),
        ],
    },
];

#[must_use]
pub fn lookup(backend_type: &str) -> Option<&'static BackendKnowledge> {
    BACKENDS
        .iter()
        .find(|entry| entry.backend_type == backend_type)
}

fn parse_all(texts: &[&str]) -> impl Iterator<Item = Constraint> {
    // The table is compile-time data; anything unparseable is a table bug
    // and is skipped rather than failing resolution.
    texts.iter().filter_map(|text| text.parse().ok()).collect::<Vec<_>>().into_iter()
}

/// Version constraints implied by a backend configuration: the base
/// constraints for the type, plus one set per recognized configuration key
/// present and per recognized environment variable set. Unknown keys imply
/// nothing.
#[must_use]
pub fn backend_constraints<'a>(
    backend_type: &str,
    config_keys: impl Iterator<Item = &'a str>,
    env: &BTreeMap<String, String>,
) -> Vec<Constraint> {
    let Some(knowledge) = lookup(backend_type) else {
        return Vec::new();
    };

    let mut constraints: Vec<Constraint> = parse_all(knowledge.constraints).collect();

    for key in config_keys {
        if let Some((_, implied)) = knowledge
            .key_constraints
            .iter()
            .find(|(known, _)| *known == key)
        {
            constraints.extend(parse_all(implied));
        }
    }

    for (env_var, implied) in knowledge.env_constraints {
        if env.contains_key(*env_var) {
            constraints.extend(parse_all(implied));
        }
    }

    constraints
}

/// The curated configuration surface identifying which state a backend
/// config points at: recognized keys with their values, falling back to the
/// associated environment variables. Auth material and tuning knobs are
/// excluded by construction.
#[must_use]
pub fn fingerprint_inputs(
    backend_type: &str,
    config: &Map<String, Value>,
    env: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let Some(knowledge) = lookup(backend_type) else {
        // An unknown backend has no curated surface; take everything as-is.
        return config
            .iter()
            .map(|(key, value)| (key.clone(), render_value(value)))
            .collect();
    };

    let mut inputs = BTreeMap::new();
    for (key, env_fallbacks) in knowledge.fingerprint {
        let value = config
            .get(*key)
            .map(render_value)
            .filter(|value| !value.is_empty())
            .or_else(|| {
                env_fallbacks
                    .iter()
                    .find_map(|fallback| env.get(*fallback).cloned())
            })
            .unwrap_or_default();
        inputs.insert((*key).to_string(), value);
    }

    inputs
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constraint_strings(constraints: &[Constraint]) -> Vec<String> {
        constraints.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn oss_constraints_cover_base_keys_and_nested_blocks() {
        let constraints = backend_constraints(
            "oss",
            ["access_key", "mystery", "assume_role"].into_iter(),
            &BTreeMap::new(),
        );
        assert_eq!(
            constraint_strings(&constraints),
            vec![">=0.12.2", ">=0.12.2", ">=0.12.6"]
        );
    }

    #[test]
    fn gcs_constraints_include_removed_key_upper_bounds() {
        let constraints = backend_constraints(
            "gcs",
            ["bucket", "impersonate_service_account", "region", "unknown", "path"].into_iter(),
            &BTreeMap::new(),
        );
        assert_eq!(
            constraint_strings(&constraints),
            vec![
                ">=0.9.0",
                ">=0.9.0",
                ">=0.14.0",
                ">=0.11.0",
                "<=0.15.3",
                ">=0.9.0",
                "<=0.14.11"
            ]
        );
    }

    #[test]
    fn s3_base_constraint_is_the_backend_introduction() {
        let constraints = backend_constraints(
            "s3",
            ["bucket", "key", "region"].into_iter(),
            &BTreeMap::new(),
        );
        assert!(
            constraints
                .iter()
                .any(|c| c.to_string() == ">=0.9.0")
        );
    }

    #[test]
    fn environment_variables_imply_constraints() {
        let env: BTreeMap<String, String> =
            [("ARM_USE_OIDC".to_string(), "true".to_string())].into();
        let constraints = backend_constraints("azurerm", std::iter::empty(), &env);
        assert!(constraints.iter().any(|c| c.to_string() == ">=1.2.0"));
    }

    #[test]
    fn unknown_backend_implies_nothing() {
        assert!(backend_constraints("floppynet", std::iter::empty(), &BTreeMap::new()).is_empty());
    }

    #[test]
    fn fingerprint_inputs_curate_and_fall_back_to_env() {
        let config: Map<String, Value> = serde_json::from_str(
            r#"{"bucket": "state", "key": "prod.tfstate", "access_key": "SECRET"}"#,
        )
        .expect("valid config in test");
        let env: BTreeMap<String, String> =
            [("AWS_S3_ENDPOINT".to_string(), "http://minio:9000".to_string())].into();

        let inputs = fingerprint_inputs("s3", &config, &env);

        assert_eq!(inputs.get("bucket").map(String::as_str), Some("state"));
        assert_eq!(
            inputs.get("endpoint").map(String::as_str),
            Some("http://minio:9000")
        );
        // auth material never enters the curated surface
        assert!(!inputs.contains_key("access_key"));
    }
}
