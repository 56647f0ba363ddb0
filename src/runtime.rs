//! Tokio runtime for the command-line entry point.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::{AppError, Result};

/// How long shutdown waits for blocking tasks before abandoning them.
///
/// An operator prompt left open on a blocking thread must not keep the
/// process alive after the session has ended.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run `future` to completion on a fresh multi-thread runtime, then shut
/// the runtime down without waiting more than [`SHUTDOWN_GRACE`] for
/// blocking tasks.
///
/// # Errors
///
/// [`AppError::Config`] when the runtime cannot be built.
pub fn run_blocking<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?;

    let output = runtime.block_on(future);
    debug!("shutting down runtime");
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    Ok(output)
}
