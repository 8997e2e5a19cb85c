//! ProcessRunner — spawns a command, captures output, enforces a timeout.
//!
//! `run` never fails: spawn errors, timeouts, and non-zero exits all resolve
//! to a [`RunResult`] value. Callers branch on `success` and read the captured
//! output; nothing here propagates an error to the caller.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;

/// Immutable snapshot of one finished (or forcibly killed) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// True iff the process exited with code 0.
    pub success: bool,
    /// Exit code; `None` when the process was killed before exiting normally
    /// or never spawned at all.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl RunResult {
    fn spawn_failure(message: String, start: Instant) -> Self {
        RunResult {
            success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Run `command` with `args` in `working_dir`, capturing stdout and stderr.
///
/// The child inherits the parent environment with `LANG=C.UTF-8` supplied when
/// LANG is unset; `env_overrides` win over both. Stdout and stderr are drained
/// concurrently while waiting for the child to exit; on timeout the child
/// process itself is killed (kill errors ignored, not propagated) and whatever
/// output was captured so far is returned with `success = false` and a `None`
/// exit code.
///
/// Concurrent calls are fully independent — each owns its own timer and child
/// handle; the timer is dropped with the select on every exit path.
pub async fn run(
    command: &str,
    args: &[String],
    working_dir: &Path,
    timeout: Duration,
    env_overrides: &HashMap<String, String>,
) -> RunResult {
    let start = Instant::now();

    let mut cmd = tokio::process::Command::new(command);
    cmd.args(args);
    cmd.current_dir(working_dir);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    if std::env::var_os("LANG").is_none() {
        cmd.env("LANG", "C.UTF-8");
    }
    for (k, v) in env_overrides {
        cmd.env(k, v);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "failed to spawn command");
            return RunResult::spawn_failure(format!("failed to spawn '{}': {}", command, e), start);
        }
    };

    // Take the pipes before waiting so the child stays killable on timeout
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let mut stdout_bytes = Vec::new();
    let mut stderr_bytes = Vec::new();

    let (exit_code, timed_out) = tokio::select! {
        status = async {
            if let Some(mut out) = stdout_pipe {
                let _ = out.read_to_end(&mut stdout_bytes).await;
            }
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut stderr_bytes).await;
            }
            child.wait().await
        } => {
            match status {
                Ok(status) => (status.code(), false),
                Err(_) => (None, false),
            }
        }
        _ = tokio::time::sleep(timeout) => {
            // Kill the process itself, not just the future; errors from the
            // kill attempt are ignored
            let _ = child.kill().await;
            (None, true)
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    tracing::info!(
        command = %command,
        args = ?args,
        exit_code = ?exit_code,
        duration_ms = %duration_ms,
        timed_out = %timed_out,
        "remote command finished"
    );

    RunResult {
        success: exit_code == Some(0),
        exit_code,
        stdout,
        stderr,
        duration_ms,
    }
}
