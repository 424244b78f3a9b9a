use std::path::Path;

use tokio::process::Command;

/// Captured output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run a toolchain subcommand non-interactively and capture its output.
///
/// The child inherits the ambient CI environment with the given overrides
/// applied on top. `TF_INPUT=false` is always set so the child can never
/// prompt.
///
/// # Errors
/// Returns an error if the process cannot be spawned or awaited; a non-zero
/// exit is not an error here, it is reported through [`ExecOutput::success`].
pub async fn run_captured(
    program: &Path,
    args: &[&str],
    cwd: &Path,
    env_overrides: &[(&str, &str)],
) -> std::io::Result<ExecOutput> {
    let mut command = Command::new(program);
    command.args(args).current_dir(cwd).env("TF_INPUT", "false");
    for (key, value) in env_overrides {
        command.env(key, value);
    }

    log::debug!("running {} {}", program.display(), args.join(" "));
    let output = command.output().await?;
    log::debug!("{} exited with {}", program.display(), output.status);

    Ok(ExecOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
