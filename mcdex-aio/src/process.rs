// mcdex-aio/src/process.rs
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Output, Stdio};

use mcdex_common::error::{McdexError, Result};
use tokio::process::Command;
use tracing::{debug, error};

/// Runs an external command to completion and captures its output.
/// A non-zero exit is not an error here; see [`ensure_success`].
pub async fn run_command_async(
    command: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    envs: Option<HashMap<String, String>>,
) -> Result<Output> {
    debug!(
        "Async Running command: {} {:?} (cwd: {:?}, envs: {:?})",
        command,
        args,
        cwd,
        envs.as_ref().map(|e| e.keys().collect::<Vec<_>>())
    );

    let mut cmd = Command::new(&command);
    cmd.args(&args);
    cmd.kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    if let Some(env_map) = envs {
        cmd.envs(env_map);
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(Stdio::null());

    match cmd.output().await {
        Ok(output) => {
            if !output.status.success() {
                debug!("Command failed with status: {}", output.status);
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.trim().is_empty() {
                    debug!("Stderr:\n{}", stderr.trim());
                }
            }
            Ok(output)
        }
        Err(e) => {
            error!("Failed to execute {}: {}", command, e);
            Err(McdexError::CommandExec(format!("{command}: {e}")))
        }
    }
}

/// Turns a non-zero exit into `CommandExec` carrying the tail of stderr.
pub fn ensure_success(what: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    let tail: Vec<&str> = tail.into_iter().rev().collect();
    Err(McdexError::CommandExec(format!(
        "{what} exited with {}: {}",
        output.status,
        tail.join(" | ")
    )))
}
