//! Terraform Cloud/Enterprise workspace lookup.

use serde::Deserialize;
use serde_json::Value;

use tfsetup_core::{ResolveContext, ResolveError};

const DEFAULT_HOSTNAME: &str = "app.terraform.io";

#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("cloud operation failed: unauthorized")]
    Unauthorized,
    #[error("cloud rate limit reached")]
    RateLimited,
    #[error("cloud returned unexpected response code {status}")]
    UnexpectedStatus { status: reqwest::StatusCode },
    #[error("cloud request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("failed to parse cloud response: {0}")]
    Parse(#[source] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct WorkspaceDocument {
    data: WorkspaceData,
}

#[derive(Debug, Deserialize)]
struct WorkspaceData {
    attributes: WorkspaceAttributes,
}

/// The workspace attributes the resolver cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceAttributes {
    #[serde(rename = "terraform-version")]
    pub terraform_version: Option<String>,
    #[serde(rename = "tag-names", default)]
    pub tag_names: Vec<String>,
}

/// Minimal client for the workspaces endpoint of the v2 API.
#[derive(Debug, Clone)]
pub struct CloudClient {
    http: reqwest::Client,
}

impl CloudClient {
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch a workspace by organization and full name. A 404 is "no such
    /// workspace", not an error.
    ///
    /// # Errors
    /// Returns an error for auth, rate-limit, transport, or decode failures.
    pub async fn get_workspace(
        &self,
        hostname: &str,
        token: &str,
        organization: &str,
        workspace: &str,
    ) -> Result<Option<WorkspaceAttributes>, CloudError> {
        let url =
            format!("https://{hostname}/api/v2/organizations/{organization}/workspaces/{workspace}");
        log::debug!("looking up remote workspace at {url}");

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/vnd.api+json")
            .send()
            .await
            .map_err(CloudError::Request)?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            reqwest::StatusCode::UNAUTHORIZED => Err(CloudError::Unauthorized),
            reqwest::StatusCode::TOO_MANY_REQUESTS => Err(CloudError::RateLimited),
            status if !status.is_success() => Err(CloudError::UnexpectedStatus { status }),
            _ => {
                let document: WorkspaceDocument =
                    response.json().await.map_err(CloudError::Parse)?;
                Ok(Some(document.data.attributes))
            }
        }
    }
}

/// How the workspaces block names its workspaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceNaming {
    Name(String),
    Prefix(String),
    Tags(Vec<String>),
    Unspecified,
}

/// A resolved `remote`-backend or `cloud`-block configuration.
#[derive(Debug, Clone)]
pub struct CloudBackendConfig {
    pub hostname: String,
    pub organization: Option<String>,
    pub token: Option<String>,
    pub workspaces: WorkspaceNaming,
}

/// Resolve the cloud configuration for the module, if it has one. Explicit
/// backend-config overrides take precedence over the module's own values.
#[must_use]
pub fn cloud_backend_config(ctx: &ResolveContext) -> Option<CloudBackendConfig> {
    let block = if ctx.facts.backend_type() == "remote" {
        &ctx.facts.backend_config
    } else {
        ctx.facts.cloud_config.as_ref()?
    };

    let get = |key: &str| -> Option<String> {
        ctx.backend_config_vars
            .get(key)
            .cloned()
            .or_else(|| block.get(key).and_then(Value::as_str).map(str::to_string))
    };

    let token = get("token")
        .or_else(|| ctx.env("TFE_TOKEN").map(str::to_string))
        .or_else(|| {
            host_token(
                ctx.env("TERRAFORM_CLOUD_TOKENS")?,
                &get("hostname").unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
            )
        });

    Some(CloudBackendConfig {
        hostname: get("hostname").unwrap_or_else(|| DEFAULT_HOSTNAME.to_string()),
        organization: get("organization"),
        token,
        workspaces: workspace_naming(block.get("workspaces")),
    })
}

/// The full remote workspace name for the requested local workspace.
///
/// # Errors
/// A configured exact `name` that differs from the requested workspace is a
/// configuration bug, reported with both names.
pub fn full_workspace_name(
    naming: &WorkspaceNaming,
    requested: &str,
) -> Result<String, ResolveError> {
    match naming {
        WorkspaceNaming::Prefix(prefix) => Ok(format!("{prefix}{requested}")),
        WorkspaceNaming::Name(name) if name != requested => Err(ResolveError::WorkspaceMismatch {
            configured: name.clone(),
            requested: requested.to_string(),
        }),
        _ => Ok(requested.to_string()),
    }
}

fn workspace_naming(value: Option<&Value>) -> WorkspaceNaming {
    // The parser emits nested blocks as arrays of objects; accept a bare
    // object too.
    let object = match value {
        Some(Value::Array(blocks)) => blocks.first().and_then(Value::as_object),
        Some(Value::Object(object)) => Some(object),
        _ => None,
    };
    let Some(object) = object else {
        return WorkspaceNaming::Unspecified;
    };

    if let Some(name) = object.get("name").and_then(Value::as_str) {
        WorkspaceNaming::Name(name.to_string())
    } else if let Some(prefix) = object.get("prefix").and_then(Value::as_str) {
        WorkspaceNaming::Prefix(prefix.to_string())
    } else if let Some(tags) = object.get("tags").and_then(Value::as_array) {
        WorkspaceNaming::Tags(
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    } else {
        WorkspaceNaming::Unspecified
    }
}

/// Look a hostname up in a `host=token` credential list.
fn host_token(tokens: &str, hostname: &str) -> Option<String> {
    tokens
        .replace(',', "\n")
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .find(|(host, _)| host.trim() == hostname)
        .map(|(_, token)| token.trim().to_string())
}
