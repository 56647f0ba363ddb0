//! Outbound writer task.
//!
//! Every message for the agent, orchestrator requests and permission
//! replies alike, goes through one [`mpsc`] queue into this task. Lines are
//! therefore written whole and in queue order, never interleaved.

use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{AppError, Result};

/// Drain `queue` into the agent's stdin as NDJSON, flushing after each line.
///
/// Returns when `cancel` fires or every sender is gone. Whatever is still
/// queued at cancellation is dropped.
///
/// # Errors
///
/// - [`AppError::Acp`]`("failed to serialise outbound message: …")`.
/// - [`AppError::Acp`]`("write failed: …")` once the agent's stdin is
///   gone, typically because the process exited.
pub async fn run_writer<W>(
    mut stdin: W,
    mut queue: mpsc::Receiver<Value>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        let message = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp writer: cancelled");
                return Ok(());
            }

            message = queue.recv() => message,
        };

        let Some(message) = message else {
            debug!("acp writer: queue closed");
            return Ok(());
        };

        let mut line = serde_json::to_vec(&message)
            .map_err(|e| AppError::Acp(format!("failed to serialise outbound message: {e}")))?;
        line.push(b'\n');

        let written = async {
            stdin.write_all(&line).await?;
            stdin.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "acp writer: write to agent stdin failed");
            return Err(AppError::Acp(format!("write failed: {e}")));
        }
        trace!(bytes = line.len(), "acp writer: line written");
    }
}
