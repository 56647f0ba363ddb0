//! End-to-end session state machine.
//!
//! ```text
//! spawning → initializing → session-created → (model-selection)? → prompting
//!          → completed | cancelled | errored
//! ```
//!
//! [`run_session`] owns the agent process for exactly the duration of the
//! call. Whatever happens after the spawn, teardown runs in the same order:
//! the connection is closed (pending requests fail, loops stop), the process
//! is killed and reaped, and the display is stopped with a final message.
//! [`drive_session`] is the part that runs over any byte streams, which is
//! what tests exercise with in-memory agents.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::acp::connection::Connection;
use crate::acp::handshake::{create_session, initialize, text_prompt};
use crate::acp::schema::{McpServer, StopReason};
use crate::acp::spawner::{spawn_agent, SpawnConfig};
use crate::agents::AgentCommand;
use crate::operator::{OperatorPrompt, ProgressDisplay};
use crate::orchestrator::events::SessionEvents;
use crate::orchestrator::model_select::{choose_model, ModelChoice};
use crate::permission::PermissionMediator;
use crate::tracker::progress::ProgressState;
use crate::tracker::ToolCallTracker;
use crate::{AppError, Result};

/// Action label shown until the first tool call starts.
pub const INITIAL_ACTION: &str = "Working";

/// How long teardown waits for the event loop to hand its state back.
const READER_JOIN_GRACE: Duration = Duration::from_secs(5);

// ── Types ─────────────────────────────────────────────────────────────────────

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Launching the agent process.
    Spawning,
    /// Waiting for the `initialize` answer.
    Initializing,
    /// `session/new` succeeded.
    SessionCreated,
    /// Waiting for the operator to pick a model.
    ModelSelection,
    /// The prompt turn is running.
    Prompting,
    /// The turn ended normally.
    Completed,
    /// The operator or the agent cancelled.
    Cancelled,
    /// A terminal error occurred.
    Errored,
}

impl Phase {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spawning => "spawning",
            Self::Initializing => "initializing",
            Self::SessionCreated => "session-created",
            Self::ModelSelection => "model-selection",
            Self::Prompting => "prompting",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Errored => "errored",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed for one invocation.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    /// Agent launch command.
    pub agent: AgentCommand,
    /// Working directory for the process and the session.
    pub cwd: PathBuf,
    /// Prompt text.
    pub prompt: String,
    /// External tool servers attached to the session.
    pub mcp_servers: Vec<McpServer>,
    /// Bound on the `initialize` exchange.
    pub initialize_timeout: Duration,
    /// Optional bound on the prompt turn.
    pub prompt_timeout: Option<Duration>,
    /// Forward agent stderr into debug logs.
    pub log_stderr: bool,
    /// Expected number of external-tool calls, for the progress ratio.
    pub expected_external_calls: Option<usize>,
}

/// Normalized terminal outcome of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The turn ended with `end_turn` or an agent-defined reason.
    Completed {
        /// Reported stop reason.
        stop_reason: StopReason,
        /// Final progress.
        progress: ProgressState,
        /// Concatenated agent reply text.
        agent_message: String,
        /// The event loop did not hand its state back; `progress` and
        /// `agent_message` are empty rather than accurate.
        progress_lost: bool,
    },
    /// The operator cancelled, or the agent reported `cancelled`.
    Cancelled {
        /// Phase the cancellation happened in.
        phase: Phase,
        /// Progress up to the cancellation.
        progress: ProgressState,
        /// The event loop did not hand its state back.
        progress_lost: bool,
    },
}

impl SessionOutcome {
    /// Final progress regardless of outcome.
    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        match self {
            Self::Completed { progress, .. } | Self::Cancelled { progress, .. } => progress,
        }
    }
}

/// Last line left on the display.
#[must_use]
pub fn final_message(result: &Result<SessionOutcome>) -> String {
    match result {
        Ok(SessionOutcome::Completed {
            stop_reason,
            progress,
            progress_lost,
            ..
        }) => {
            let mut line = match stop_reason {
                StopReason::EndTurn => "Done".to_owned(),
                other => format!("Done ({other})"),
            };
            if *progress_lost {
                line.push_str(" · progress unavailable");
                return line;
            }
            let summary = progress.summary();
            if !summary.is_empty() {
                line.push_str(" · ");
                line.push_str(&summary);
            }
            if progress.failed > 0 {
                line.push_str(&format!(", {} failed", progress.failed));
            }
            line
        }
        Ok(SessionOutcome::Cancelled {
            phase,
            progress_lost,
            ..
        }) => {
            if *progress_lost {
                format!("Cancelled during {phase} · progress unavailable")
            } else {
                format!("Cancelled during {phase}")
            }
        }
        Err(err) => format!("Failed: {err}"),
    }
}

enum Flow {
    Finished(StopReason),
    Aborted,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Run one complete session against a freshly spawned agent.
///
/// The process never outlives this call: it is killed on every path, and
/// `kill_on_drop` covers the call being dropped mid-way.
///
/// # Errors
///
/// - [`AppError::Spawn`] when the agent cannot be launched.
/// - [`AppError::Timeout`] when `initialize` or the prompt turn time out.
/// - [`AppError::Rpc`] / [`AppError::ConnectionClosed`] when a request fails.
/// - [`AppError::Config`] for an empty prompt or an invalid `cwd`.
pub async fn run_session(
    request: SessionRequest,
    display: Arc<dyn ProgressDisplay>,
    prompt: Arc<dyn OperatorPrompt>,
) -> Result<SessionOutcome> {
    let span = info_span!("session", agent = %request.agent);

    async move {
        display.start(&format!("Starting {}", request.agent.program));
        info!(phase = %Phase::Spawning, "session: phase");

        let spawned = spawn_agent(&SpawnConfig {
            command: request.agent.clone(),
            workspace_root: request.cwd.clone(),
            log_stderr: request.log_stderr,
        });
        let mut process = match spawned {
            Ok(process) => process,
            Err(err) => {
                warn!(phase = %Phase::Spawning, %err, "session: errored");
                let result = Err(err);
                display.stop(&final_message(&result));
                return result;
            }
        };

        let result = match process.take_stdio() {
            Ok((stdin, stdout)) => {
                drive_session(stdout, stdin, &request, Arc::clone(&display), prompt).await
            }
            Err(err) => Err(err),
        };

        process.kill().await;
        display.stop(&final_message(&result));
        result
    }
    .instrument(span)
    .await
}

/// Run the protocol part of a session over an agent's streams.
///
/// Closes the connection and collects the event state before returning; the
/// caller owns the process and the display's final stop.
///
/// # Errors
///
/// Same as [`run_session`] except spawn errors.
pub async fn drive_session<R, W>(
    stdout: R,
    stdin: W,
    request: &SessionRequest,
    display: Arc<dyn ProgressDisplay>,
    prompt: Arc<dyn OperatorPrompt>,
) -> Result<SessionOutcome>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let tracker = ToolCallTracker::new(INITIAL_ACTION, request.expected_external_calls);
    let mediator = PermissionMediator::new(Arc::clone(&prompt), Arc::clone(&display));
    let events = SessionEvents::new(tracker, mediator, Arc::clone(&display));
    let (connection, tasks) = Connection::start(stdout, stdin, events);

    display.start("Initializing agent");
    let mut phase = Phase::Initializing;
    let flow = run_phases(
        &connection,
        request,
        prompt.as_ref(),
        display.as_ref(),
        &mut phase,
    )
    .await;

    connection.close();
    let (progress, agent_message, progress_lost) = match join_events(tasks.reader).await {
        Some((progress, agent_message)) => (progress, agent_message, false),
        None => (ProgressState::default(), String::new(), true),
    };
    drop(tasks.writer);

    match flow {
        Ok(Flow::Finished(StopReason::Cancelled)) => {
            info!(phase = %Phase::Cancelled, "session: agent reported cancelled");
            Ok(SessionOutcome::Cancelled {
                phase: Phase::Prompting,
                progress,
                progress_lost,
            })
        }
        Ok(Flow::Finished(stop_reason)) => {
            info!(phase = %Phase::Completed, %stop_reason, "session: phase");
            Ok(SessionOutcome::Completed {
                stop_reason,
                progress,
                agent_message,
                progress_lost,
            })
        }
        Ok(Flow::Aborted) => {
            info!(phase = %Phase::Cancelled, during = %phase, "session: cancelled by operator");
            Ok(SessionOutcome::Cancelled {
                phase,
                progress,
                progress_lost,
            })
        }
        Err(err) => {
            warn!(phase = %Phase::Errored, during = %phase, %err, "session: errored");
            Err(err)
        }
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

async fn run_phases(
    connection: &Connection,
    request: &SessionRequest,
    prompt: &dyn OperatorPrompt,
    display: &dyn ProgressDisplay,
    phase: &mut Phase,
) -> Result<Flow> {
    let blocks = text_prompt(&request.prompt)?;

    enter(phase, Phase::Initializing);
    initialize(connection, request.initialize_timeout).await?;

    let session = create_session(connection, &request.cwd, request.mcp_servers.clone()).await?;
    enter(phase, Phase::SessionCreated);

    if session
        .models
        .as_ref()
        .is_some_and(|models| models.available_models.len() > 1)
    {
        enter(phase, Phase::ModelSelection);
        display.stop("");
        let choice = choose_model(session.models.as_ref(), prompt).await;
        display.start(INITIAL_ACTION);

        match choice? {
            ModelChoice::Keep => {}
            ModelChoice::Switch(model_id) => {
                connection.set_model(&session.session_id, &model_id).await?;
                info!(
                    session_id = session.session_id.as_str(),
                    model_id = model_id.as_str(),
                    "session: model switched"
                );
            }
            ModelChoice::Cancelled => return Ok(Flow::Aborted),
        }
    }

    enter(phase, Phase::Prompting);
    display.update(INITIAL_ACTION);

    let turn = connection.prompt(&session.session_id, blocks);
    let result = match request.prompt_timeout {
        Some(limit) => tokio::time::timeout(limit, turn)
            .await
            .map_err(|_| AppError::Timeout(format!("prompt turn exceeded {limit:?}")))??,
        None => turn.await?,
    };

    info!(
        session_id = session.session_id.as_str(),
        stop_reason = %result.stop_reason,
        "session: prompt turn finished"
    );
    Ok(Flow::Finished(result.stop_reason))
}

fn enter(phase: &mut Phase, next: Phase) {
    *phase = next;
    info!(phase = %next, "session: phase");
}

/// Wait for the read loop to return the event handler after `close`.
/// `None` means the tracker state and agent text were lost with the loop.
async fn join_events(reader: JoinHandle<SessionEvents>) -> Option<(ProgressState, String)> {
    let abort = reader.abort_handle();
    match tokio::time::timeout(READER_JOIN_GRACE, reader).await {
        Ok(Ok(events)) => Some(events.into_parts()),
        Ok(Err(err)) => {
            warn!(%err, "session: event loop ended abnormally, progress lost");
            None
        }
        Err(_) => {
            abort.abort();
            warn!("session: event loop did not stop in time, aborted, progress lost");
            None
        }
    }
}
