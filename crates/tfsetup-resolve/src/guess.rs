//! Remote-state version guessing by adaptive elimination.
//!
//! When no declarative signal names a version, candidate binaries are run
//! against the live remote state and their failure messages interpreted.
//! Probes are expensive, so the loop eliminates as much of the pool as each
//! outcome allows.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use tfsetup_core::{
    Constraint, ResolveContext, Version, apply_constraints, earliest_non_prerelease,
};
use tfsetup_install::Installer;
use tfsetup_platform::run_captured;

use crate::backend_hcl::dump_backend_hcl;
use crate::stderr::{ProbeMessage, classify};

/// What a single probe of one candidate binary established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The exact version that wrote the state; the search is over.
    WriterVersion(Version),
    /// The state narrows the pool without naming a version.
    Narrow(Constraint),
    /// There is no state at all; that is an answer, not an error.
    NoState,
    /// Nothing was learned beyond "not this one".
    Ambiguous,
}

/// Seam between the elimination loop and actually running binaries.
#[async_trait]
pub trait StateProbe: Send + Sync {
    async fn probe(
        &self,
        version: &Version,
        ctx: &ResolveContext,
        backend_hcl: &str,
    ) -> ProbeOutcome;
}

/// The elimination search itself.
pub struct StateGuesser {
    probe: Box<dyn StateProbe>,
}

impl StateGuesser {
    #[must_use]
    pub fn new(probe: Box<dyn StateProbe>) -> Self {
        Self { probe }
    }

    /// Guess which version wrote the module's remote state, probing earliest
    /// non-pre-release candidates first. Returns `None` when there is no
    /// state, or when the pool is exhausted without an answer.
    pub async fn guess(&self, ctx: &ResolveContext, candidates: &[Version]) -> Option<Version> {
        let backend_hcl = dump_backend_hcl(&ctx.facts);
        if backend_hcl.is_empty() {
            return None;
        }

        let mut pool = candidates.to_vec();
        while let Some(trial) = earliest_non_prerelease(&pool) {
            log::debug!("probing state with {} {trial}", trial.product);
            match self.probe.probe(&trial, ctx, &backend_hcl).await {
                ProbeOutcome::WriterVersion(version) => return Some(version),
                ProbeOutcome::NoState => return None,
                ProbeOutcome::Narrow(constraint) => {
                    log::debug!("state narrows candidates to {constraint}");
                    pool = apply_constraints(&pool, &[constraint]);
                    // every iteration must shrink the pool, whatever the
                    // probe reported
                    if pool.contains(&trial) {
                        pool = apply_constraints(&pool, &[Constraint::not(&trial)]);
                    }
                }
                ProbeOutcome::Ambiguous => {
                    pool = apply_constraints(&pool, &[Constraint::not(&trial)]);
                }
            }
        }

        None
    }
}

/// Probes by materializing the candidate binary and running `init` and
/// `state pull` against a synthesized module in a scratch directory.
pub struct CommandProbe {
    installer: Arc<Installer>,
}

impl CommandProbe {
    #[must_use]
    pub fn new(installer: Arc<Installer>) -> Self {
        Self { installer }
    }

    fn init_args(ctx: &ResolveContext) -> Vec<String> {
        let mut args = Vec::new();
        for file in &ctx.backend_config_files {
            args.push(format!("-backend-config={}", file.display()));
        }
        for (key, value) in &ctx.backend_config_vars {
            args.push(format!("-backend-config={key}={value}"));
        }
        args
    }

    async fn run(
        &self,
        version: &Version,
        ctx: &ResolveContext,
        backend_hcl: &str,
    ) -> Result<ProbeOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let executable: PathBuf = self.installer.executable(version).await?;

        let scratch = tempfile::tempdir()?;
        std::fs::write(scratch.path().join("terraform.tf"), backend_hcl)?;

        let init_args = Self::init_args(ctx);
        let mut args: Vec<&str> = vec!["init"];
        args.extend(init_args.iter().map(String::as_str));

        let env = [("TF_WORKSPACE", ctx.workspace.as_str())];
        let init = run_captured(&executable, &args, scratch.path(), &env).await?;
        if !init.success {
            return Ok(match classify(&init.stderr) {
                ProbeMessage::StateWrittenBy(writer) => {
                    match Version::parse(&writer, ctx.product) {
                        Ok(version) => ProbeOutcome::WriterVersion(version),
                        Err(error) => {
                            log::debug!("unparseable writer version {writer:?}: {error}");
                            ProbeOutcome::Ambiguous
                        }
                    }
                }
                ProbeMessage::UnsupportedStateVersion => narrow_to_v4_capable(),
                ProbeMessage::NoWorkspace => ProbeOutcome::NoState,
                ProbeMessage::NoState | ProbeMessage::Other => {
                    log::debug!("init failed: {}", init.stderr.trim());
                    ProbeOutcome::Ambiguous
                }
            });
        }

        let pull = run_captured(&executable, &["state", "pull"], scratch.path(), &env).await?;
        if !pull.success {
            return Ok(match classify(&pull.stderr) {
                ProbeMessage::UnsupportedStateVersion => narrow_to_v4_capable(),
                _ => {
                    log::debug!("state pull failed: {}", pull.stderr.trim());
                    ProbeOutcome::Ambiguous
                }
            });
        }

        Ok(interpret_pulled_state(
            version,
            ctx,
            &pull.stdout,
            &pull.stderr,
        ))
    }
}

fn narrow_to_v4_capable() -> ProbeOutcome {
    // pools always contain post-0.12 versions, so this parses
    match ">=0.12.0".parse() {
        Ok(constraint) => ProbeOutcome::Narrow(constraint),
        Err(_) => ProbeOutcome::Ambiguous,
    }
}

/// Decide what a successful `state pull` means for the tried version.
fn interpret_pulled_state(
    tried: &Version,
    ctx: &ResolveContext,
    stdout: &str,
    stderr: &str,
) -> ProbeOutcome {
    let state_self_reports = tried.major == 0 && tried.minor < 12;

    match serde_json::from_str::<serde_json::Value>(stdout) {
        Ok(state) => {
            let serial = state.get("serial").and_then(serde_json::Value::as_u64);
            let version_field = state.get("version").and_then(serde_json::Value::as_u64);
            let outputs_empty = state
                .get("outputs")
                .and_then(serde_json::Value::as_object)
                .is_none_or(serde_json::Map::is_empty);

            if version_field == Some(4) && serial == Some(0) && outputs_empty {
                return ProbeOutcome::NoState;
            }
            if classify(stderr) == ProbeMessage::NoState {
                return ProbeOutcome::NoState;
            }

            if state_self_reports {
                // pre-0.12 binaries report the writer version faithfully
                if let Some(writer) = state.get("terraform_version").and_then(|v| v.as_str()) {
                    if let Ok(version) = Version::parse(writer, ctx.product) {
                        return ProbeOutcome::WriterVersion(version);
                    }
                }
            }

            // newer binaries rewrite the field; being able to read the state
            // is the answer
            ProbeOutcome::WriterVersion(tried.clone())
        }
        Err(error) => {
            if classify(stderr) == ProbeMessage::NoState {
                return ProbeOutcome::NoState;
            }
            log::debug!("unparseable state output: {error}");
            ProbeOutcome::WriterVersion(tried.clone())
        }
    }
}

#[async_trait]
impl StateProbe for CommandProbe {
    async fn probe(
        &self,
        version: &Version,
        ctx: &ResolveContext,
        backend_hcl: &str,
    ) -> ProbeOutcome {
        match self.run(version, ctx, backend_hcl).await {
            Ok(outcome) => outcome,
            Err(error) => {
                // probe trouble must never abort resolution
                log::debug!("probe of {version} failed: {error}");
                ProbeOutcome::Ambiguous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tfsetup_core::ModuleFacts;

    #[derive(Clone)]
    struct ScriptedProbe {
        outcomes: Arc<Mutex<std::vec::IntoIter<ProbeOutcome>>>,
        probed: Arc<Mutex<Vec<Version>>>,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<ProbeOutcome>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into_iter())),
                probed: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn probed(&self) -> Vec<Version> {
            self.probed.lock().expect("probe log lock").clone()
        }
    }

    #[async_trait]
    impl StateProbe for ScriptedProbe {
        async fn probe(
            &self,
            version: &Version,
            _ctx: &ResolveContext,
            _backend_hcl: &str,
        ) -> ProbeOutcome {
            self.probed
                .lock()
                .expect("probe log lock")
                .push(version.clone());
            self.outcomes
                .lock()
                .expect("script lock")
                .next()
                .unwrap_or(ProbeOutcome::Ambiguous)
        }
    }

    fn ctx() -> ResolveContext {
        let facts: ModuleFacts = serde_json::from_str(
            r#"{"backend_type": "s3", "backend_config": {"bucket": "b", "key": "k"}}"#,
        )
        .expect("valid facts in test");
        ResolveContext::new(facts, "/srv/module")
    }

    fn versions(texts: &[&str]) -> Vec<Version> {
        texts
            .iter()
            .map(|t| t.parse().expect("valid version in test"))
            .collect()
    }

    fn v(text: &str) -> Version {
        text.parse().expect("valid version in test")
    }

    async fn run_guess(
        script: Vec<ProbeOutcome>,
        pool: &[&str],
    ) -> (Option<Version>, Vec<Version>) {
        let probe = ScriptedProbe::new(script);
        let guesser = StateGuesser::new(Box::new(probe.clone()));
        let answer = guesser.guess(&ctx(), &versions(pool)).await;
        (answer, probe.probed())
    }

    #[tokio::test]
    async fn definite_answer_stops_the_search() {
        let (answer, probed) = run_guess(
            vec![ProbeOutcome::WriterVersion(v("0.11.14"))],
            &["0.11.14", "0.12.31", "1.5.7"],
        )
        .await;

        assert_eq!(answer, Some(v("0.11.14")));
        assert_eq!(probed, vec![v("0.11.14")]);
    }

    #[tokio::test]
    async fn probes_earliest_non_prerelease_first() {
        let (_, probed) = run_guess(
            vec![ProbeOutcome::WriterVersion(v("1.0.0"))],
            &["1.5.7", "0.13.6", "0.12.5-beta1"],
        )
        .await;

        assert_eq!(probed, vec![v("0.13.6")]);
    }

    #[tokio::test]
    async fn narrowing_moves_past_too_old_candidates() {
        let (answer, probed) = run_guess(
            vec![
                ProbeOutcome::Narrow(">=0.12.0".parse().expect("valid constraint")),
                ProbeOutcome::WriterVersion(v("0.12.31")),
            ],
            &["0.11.14", "0.12.31", "1.5.7"],
        )
        .await;

        assert_eq!(answer, Some(v("0.12.31")));
        assert_eq!(probed, vec![v("0.11.14"), v("0.12.31")]);
    }

    #[tokio::test]
    async fn ambiguous_failures_eliminate_only_the_tried_version() {
        let (answer, probed) = run_guess(
            vec![
                ProbeOutcome::Ambiguous,
                ProbeOutcome::WriterVersion(v("1.4.6")),
            ],
            &["1.4.5", "1.4.6", "1.5.7"],
        )
        .await;

        assert_eq!(answer, Some(v("1.4.6")));
        assert_eq!(probed, vec![v("1.4.5"), v("1.4.6")]);
    }

    #[tokio::test]
    async fn no_state_is_an_answer_not_an_error() {
        let (answer, probed) = run_guess(
            vec![ProbeOutcome::NoState],
            &["1.4.5", "1.4.6"],
        )
        .await;

        assert_eq!(answer, None);
        assert_eq!(probed.len(), 1);
    }

    #[tokio::test]
    async fn exhaustion_terminates_within_pool_size_probes() {
        let pool = ["0.13.0", "0.14.0", "1.0.0", "1.5.7"];
        let (answer, probed) = run_guess(
            vec![
                ProbeOutcome::Ambiguous,
                ProbeOutcome::Ambiguous,
                ProbeOutcome::Ambiguous,
                ProbeOutcome::Ambiguous,
                ProbeOutcome::Ambiguous,
            ],
            &pool,
        )
        .await;

        assert_eq!(answer, None);
        assert!(probed.len() <= pool.len());
    }

    #[tokio::test]
    async fn non_progressing_narrow_still_terminates() {
        let loose: Constraint = ">=0.1.0".parse().expect("valid constraint");
        let (answer, probed) = run_guess(
            vec![
                ProbeOutcome::Narrow(loose.clone()),
                ProbeOutcome::Narrow(loose),
                ProbeOutcome::Ambiguous,
            ],
            &["1.0.0", "1.1.0", "1.2.0"],
        )
        .await;

        assert_eq!(answer, None);
        assert!(probed.len() <= 3);
    }

    #[tokio::test]
    async fn local_backend_has_no_state_to_probe() {
        let guesser = StateGuesser::new(Box::new(ScriptedProbe::new(vec![
            ProbeOutcome::WriterVersion(v("1.0.0")),
        ])));
        let ctx = ResolveContext::new(ModuleFacts::default(), "/srv/module");

        assert_eq!(guesser.guess(&ctx, &versions(&["1.0.0"])).await, None);
    }

    #[test]
    fn pulled_state_interpretation() {
        let ctx = ctx();

        // pre-0.12 binaries trust the state's own writer version
        let outcome = interpret_pulled_state(
            &v("0.11.14"),
            &ctx,
            r#"{"version": 3, "serial": 7, "terraform_version": "0.11.8"}"#,
            "",
        );
        assert_eq!(outcome, ProbeOutcome::WriterVersion(v("0.11.8")));

        // fresh v4 state with no serial and no outputs means no state
        let outcome = interpret_pulled_state(
            &v("1.5.7"),
            &ctx,
            r#"{"version": 4, "serial": 0, "outputs": {}}"#,
            "",
        );
        assert_eq!(outcome, ProbeOutcome::NoState);

        // a >=0.12 binary that can read real state is itself the answer
        let outcome = interpret_pulled_state(
            &v("1.5.7"),
            &ctx,
            r#"{"version": 4, "serial": 12, "terraform_version": "1.5.7", "outputs": {"x": {}}}"#,
            "",
        );
        assert_eq!(outcome, ProbeOutcome::WriterVersion(v("1.5.7")));
    }
}
