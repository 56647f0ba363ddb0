//! ACP initialization handshake.
//!
//! After an agent process is spawned and its [`Connection`] is running, the
//! bridge performs the opening exchange before any prompt is sent:
//!
//! 1. **`initialize`**: announces the protocol version and the (empty)
//!    client capabilities; bounded by a timeout.
//! 2. **`session/new`**: opens a session in the absolute working
//!    directory with the attached external tool servers.
//!
//! [`text_prompt`] builds the content blocks for `session/prompt`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::acp::connection::Connection;
use crate::acp::schema::{
    ContentBlock, InitializeParams, InitializeResult, McpServer, NewSessionResult,
    PROTOCOL_VERSION,
};
use crate::{AppError, Result};

/// Send `initialize` and wait at most `timeout` for the agent's answer.
///
/// # Errors
///
/// - [`AppError::Timeout`]: no response within `timeout`.
/// - Any error of [`Connection::initialize`].
pub async fn initialize(connection: &Connection, timeout: Duration) -> Result<InitializeResult> {
    let params = InitializeParams::default();

    let result = tokio::time::timeout(timeout, connection.initialize(&params))
        .await
        .map_err(|_| {
            AppError::Timeout(format!("agent did not answer initialize within {timeout:?}"))
        })??;

    if let Some(version) = result.protocol_version {
        if version != PROTOCOL_VERSION {
            debug!(
                agent_version = version,
                client_version = PROTOCOL_VERSION,
                "handshake: agent negotiated a different protocol version"
            );
        }
    }

    match &result.agent_info {
        Some(agent) => info!(
            agent = agent.name.as_str(),
            version = agent.version.as_deref().unwrap_or("unknown"),
            "handshake: agent initialized"
        ),
        None => info!("handshake: agent initialized"),
    }
    Ok(result)
}

/// Open a session rooted at `cwd`.
///
/// # Errors
///
/// - [`AppError::Config`]: `cwd` does not exist.
/// - Any error of [`Connection::new_session`].
pub async fn create_session(
    connection: &Connection,
    cwd: &Path,
    mcp_servers: Vec<McpServer>,
) -> Result<NewSessionResult> {
    let cwd = absolute_cwd(cwd)?;
    let server_count = mcp_servers.len();
    let session = connection.new_session(cwd.clone(), mcp_servers).await?;

    info!(
        session_id = session.session_id.as_str(),
        cwd = %cwd.display(),
        mcp_servers = server_count,
        "handshake: session created"
    );
    Ok(session)
}

/// Wrap the operator's prompt text as a single text block.
///
/// # Errors
///
/// Returns [`AppError::Config`]`("prompt must not be empty")` for blank input.
pub fn text_prompt(prompt: &str) -> Result<Vec<ContentBlock>> {
    if prompt.trim().is_empty() {
        return Err(AppError::Config("prompt must not be empty".into()));
    }
    Ok(vec![ContentBlock::Text {
        text: prompt.to_owned(),
    }])
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Sessions require an absolute working directory.
fn absolute_cwd(cwd: &Path) -> Result<PathBuf> {
    cwd.canonicalize()
        .map_err(|err| AppError::Config(format!("invalid working directory {}: {err}", cwd.display())))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
