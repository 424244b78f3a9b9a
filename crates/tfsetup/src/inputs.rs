//! Command-line and CI-environment input marshalling.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;

/// Resolve and install the Terraform or OpenTofu version a module needs.
#[derive(Debug, Parser)]
#[command(name = "tfsetup", version)]
pub struct Cli {
    /// Install this exact version and skip discovery entirely.
    #[arg(id = "target_version")]
    pub version: Option<String>,

    /// Path of the module directory.
    #[arg(long, env = "INPUT_PATH", default_value = ".")]
    pub path: PathBuf,

    /// Workspace to resolve against.
    #[arg(long, env = "INPUT_WORKSPACE", default_value = "default")]
    pub workspace: String,

    /// Backend configuration overrides as `key=value` entries, comma or
    /// newline separated.
    #[arg(long, env = "INPUT_BACKEND_CONFIG", default_value = "")]
    pub backend_config: String,

    /// Extra backend configuration file paths, comma or newline separated.
    #[arg(long, env = "INPUT_BACKEND_CONFIG_FILE", default_value = "")]
    pub backend_config_file: String,

    /// Module facts document produced by the configuration parser.
    #[arg(long, env = "INPUT_MODULE_FACTS")]
    pub module_facts: Option<PathBuf>,

    /// Resolve and install OpenTofu instead of Terraform. The `OPENTOFU`
    /// environment variable (any value) does the same.
    #[arg(long)]
    pub opentofu: bool,

    /// Verbose logging. Also enabled by `RUNNER_DEBUG`.
    #[arg(long)]
    pub debug: bool,
}

/// Parse `key=value` backend configuration overrides.
#[must_use]
pub fn parse_config_vars(raw: &str) -> BTreeMap<String, String> {
    raw.replace(',', "\n")
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a comma/newline separated list of file paths.
#[must_use]
pub fn parse_config_files(raw: &str) -> Vec<PathBuf> {
    raw.replace(',', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// The token used for the github.com release listing, if one applies.
///
/// A dedicated github.com token wins; the Actions token is only usable when
/// the job itself runs against github.com rather than an enterprise host.
#[must_use]
pub fn github_token(env: &BTreeMap<String, String>) -> Option<String> {
    if let Some(token) = env.get("GITHUB_DOT_COM_TOKEN") {
        return Some(token.clone());
    }

    let api_url = env
        .get("GITHUB_API_URL")
        .map_or("https://api.github.com", String::as_str);
    if api_url == "https://api.github.com" {
        return env.get("TERRAFORM_ACTIONS_GITHUB_TOKEN").cloned();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn config_vars_accept_comma_and_newline_separators() {
        let vars = parse_config_vars("bucket=b,key=prod.tfstate\nregion = eu-west-2");
        assert_eq!(vars.get("bucket").map(String::as_str), Some("b"));
        assert_eq!(vars.get("key").map(String::as_str), Some("prod.tfstate"));
        assert_eq!(vars.get("region").map(String::as_str), Some("eu-west-2"));
    }

    #[test]
    fn malformed_config_entries_are_dropped() {
        let vars = parse_config_vars("just-a-word\n=no-key\nok=1");
        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("ok").map(String::as_str), Some("1"));
    }

    #[test]
    fn config_files_skip_blank_entries() {
        let files = parse_config_files("a.tfvars,,  \n b.tfvars ");
        assert_eq!(
            files,
            vec![PathBuf::from("a.tfvars"), PathBuf::from("b.tfvars")]
        );
    }

    #[test]
    fn github_token_prefers_the_dedicated_token() {
        let token = github_token(&env(&[
            ("GITHUB_DOT_COM_TOKEN", "dedicated"),
            ("TERRAFORM_ACTIONS_GITHUB_TOKEN", "actions"),
        ]));
        assert_eq!(token.as_deref(), Some("dedicated"));
    }

    #[test]
    fn actions_token_only_applies_to_github_dot_com() {
        let token = github_token(&env(&[
            ("TERRAFORM_ACTIONS_GITHUB_TOKEN", "actions"),
            ("GITHUB_API_URL", "https://github.enterprise.example/api/v3"),
        ]));
        assert_eq!(token, None);

        let token = github_token(&env(&[("TERRAFORM_ACTIONS_GITHUB_TOKEN", "actions")]));
        assert_eq!(token.as_deref(), Some("actions"));
    }

    #[test]
    fn cli_parses_positional_version() {
        let cli = Cli::try_parse_from(["tfsetup", "1.5.7"]).expect("valid arguments");
        assert_eq!(cli.version.as_deref(), Some("1.5.7"));
        assert_eq!(cli.workspace, "default");
        assert!(!cli.opentofu);
    }
}
