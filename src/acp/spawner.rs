//! ACP agent process spawner.
//!
//! Spawns the external agent executable with:
//! - A literal argument vector (no shell interpretation).
//! - Piped stdin/stdout for the protocol stream.
//! - stderr drained line by line into `DEBUG` logs, or discarded.
//! - `kill_on_drop(true)` so a leaked handle still takes the process down.
//!
//! The orchestrator calls [`AgentProcess::kill`] explicitly on every exit
//! path; `kill_on_drop` only backs that up.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::agents::AgentCommand;
use crate::{AppError, Result};

// ── Configuration ────────────────────────────────────────────────────────────

/// Configuration for spawning an ACP agent process.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Executable and arguments.
    pub command: AgentCommand,
    /// Working directory of the child process.
    pub workspace_root: PathBuf,
    /// Forward the agent's stderr into `DEBUG` logs instead of discarding it.
    pub log_stderr: bool,
}

// ── Process handle ───────────────────────────────────────────────────────────

/// Owned handle to a running agent process.
///
/// The protocol streams are taken out once with [`AgentProcess::take_stdio`];
/// the process itself stays here until [`AgentProcess::kill`].
#[derive(Debug)]
pub struct AgentProcess {
    child: Child,
    stdio: Option<(ChildStdin, ChildStdout)>,
    program: String,
}

impl AgentProcess {
    /// OS process id, while the process is running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the agent's stdin/stdout pair.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Spawn`] if the streams were already taken.
    pub fn take_stdio(&mut self) -> Result<(ChildStdin, ChildStdout)> {
        self.stdio
            .take()
            .ok_or_else(|| AppError::Spawn(format!("stdio of {} already taken", self.program)))
    }

    /// Kill the process and reap it.
    ///
    /// Idempotent: killing an already-exited process is a no-op. Returns the
    /// exit status when it can be collected.
    pub async fn kill(&mut self) -> Option<ExitStatus> {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!(program = self.program.as_str(), %status, "agent already exited");
            return Some(status);
        }

        if let Err(err) = self.child.start_kill() {
            debug!(program = self.program.as_str(), %err, "agent kill signal not delivered");
        }

        match self.child.wait().await {
            Ok(status) => {
                info!(program = self.program.as_str(), %status, "agent process stopped");
                Some(status)
            }
            Err(err) => {
                warn!(program = self.program.as_str(), %err, "error waiting for agent process");
                None
            }
        }
    }
}

// ── Spawner ──────────────────────────────────────────────────────────────────

/// Spawn an ACP agent process.
///
/// # Errors
///
/// - [`AppError::Spawn`]`("failed to spawn …")`: executable missing, not
///   runnable, or the working directory is invalid.
/// - [`AppError::Spawn`]`("failed to capture …")`: a stdio pipe is missing.
pub fn spawn_agent(config: &SpawnConfig) -> Result<AgentProcess> {
    let program = config.command.program.clone();
    let mut cmd = Command::new(&program);
    cmd.args(&config.command.args)
        .current_dir(&config.workspace_root)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(if config.log_stderr {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| AppError::Spawn(format!("failed to spawn {program}: {err}")))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture agent stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture agent stdout".into()))?;

    if let Some(stderr) = child.stderr.take() {
        drain_stderr(program.clone(), stderr);
    }

    info!(program = program.as_str(), pid = ?child.id(), "agent process spawned");

    Ok(AgentProcess {
        child,
        stdio: Some((stdin, stdout)),
        program,
    })
}

/// Forward stderr lines to `DEBUG` logs until the pipe closes.
fn drain_stderr(program: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => debug!(target: "agent_stderr", program = program.as_str(), "{line}"),
                Ok(None) => break,
                Err(err) => {
                    debug!(program = program.as_str(), %err, "agent stderr read failed");
                    break;
                }
            }
        }
    });
}
