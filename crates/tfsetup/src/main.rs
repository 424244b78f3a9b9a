//! CI entrypoint: resolve which Terraform/OpenTofu version a module needs,
//! acquire it securely, and install the well-known symlinks.

mod inputs;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use tfsetup_core::{ModuleFacts, Product, ResolveContext, Version};
use tfsetup_install::{GpgVerifier, Installer};
use tfsetup_opentofu::OpenTofuReleases;
use tfsetup_platform::{HostPlatform, ToolPaths};
use tfsetup_resolve::{Resolver, assemble_candidates};
use tfsetup_terraform::TerraformReleases;

use crate::inputs::{Cli, github_token, parse_config_files, parse_config_vars};

#[derive(Debug, thiserror::Error)]
enum MainError {
    #[error(transparent)]
    Resolve(#[from] tfsetup_core::ResolveError),
    #[error(transparent)]
    Install(#[from] tfsetup_install::InstallError),
    #[error(transparent)]
    Candidates(#[from] tfsetup_resolve::CandidatesError),
    #[error(transparent)]
    Platform(#[from] tfsetup_platform::HostPlatformError),
    #[error("invalid version argument: {0}")]
    Version(#[from] tfsetup_core::VersionParseError),
    #[error("failed to read module facts from {path}: {source}")]
    Facts {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

fn init_logging(debug: bool) {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto);
}

fn load_facts(path: Option<&PathBuf>) -> Result<ModuleFacts, MainError> {
    let Some(path) = path else {
        log::debug!("no module facts supplied; assuming an empty module");
        return Ok(ModuleFacts::default());
    };

    let contents = std::fs::read_to_string(path).map_err(|error| MainError::Facts {
        path: path.clone(),
        source: Box::new(error),
    })?;
    serde_json::from_str(&contents).map_err(|error| MainError::Facts {
        path: path.clone(),
        source: Box::new(error),
    })
}

async fn run(cli: Cli) -> Result<PathBuf, MainError> {
    let env: BTreeMap<String, String> = std::env::vars().collect();

    let platform = HostPlatform::detect()?;
    let paths = ToolPaths::from_env(&env);
    paths
        .ensure_dirs()
        .map_err(|source| MainError::Io {
            context: "failed to create tool directories",
            source,
        })?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("tfsetup/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let product = if cli.opentofu || env.contains_key("OPENTOFU") {
        Product::OpenTofu
    } else {
        Product::Terraform
    };

    let terraform = TerraformReleases::new(http.clone());
    let opentofu = OpenTofuReleases::new(http.clone()).with_token(github_token(&env));
    let installer = Arc::new(
        Installer::new(http.clone(), paths, platform)
            .with_terraform(terraform.clone())
            .with_opentofu(opentofu.clone())
            .with_verifier(Box::new(GpgVerifier::new(
                env.get("GNUPGHOME").map(PathBuf::from),
            ))),
    );

    // An explicit version bypasses discovery entirely.
    if let Some(version) = &cli.version {
        let version = Version::parse(version, product)?;
        log::info!("Switching to {} {version}", version.product);
        return Ok(installer.install(&version).await?);
    }

    let module_dir = std::path::absolute(&cli.path).map_err(|source| MainError::Io {
        context: "failed to resolve module path",
        source,
    })?;

    let mut ctx = ResolveContext::new(load_facts(cli.module_facts.as_ref())?, module_dir);
    ctx.workspace = cli.workspace.clone();
    ctx.workspace_root = env
        .get("GITHUB_WORKSPACE")
        .map_or_else(|| PathBuf::from("/"), PathBuf::from);
    ctx.backend_config_vars = parse_config_vars(&cli.backend_config);
    ctx.backend_config_files = parse_config_files(&cli.backend_config_file);
    ctx.env = env;
    ctx.product = product;

    let candidates = assemble_candidates(&terraform, &opentofu, product).await?;
    log::debug!("{} candidate versions known upstream", candidates.len());

    let resolver = Resolver::standard(&http, platform, installer.clone());
    let resolution = resolver.resolve(&ctx, candidates).await?;

    log::info!(
        "Switching to {} {}, chosen by the {}",
        resolution.version.product,
        resolution.version,
        resolution.source
    );
    Ok(installer.install(&resolution.version).await?)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug || std::env::var_os("RUNNER_DEBUG").is_some());

    match run(cli).await {
        Ok(executable) => println!("{}", executable.display()),
        Err(error) => {
            log::error!("{error}");
            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                log::error!("  caused by: {cause}");
                source = cause.source();
            }
            std::process::exit(1);
        }
    }
}
