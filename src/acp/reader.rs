//! ACP inbound decoding.
//!
//! Reads newline-delimited JSON messages from an agent's stdout and turns
//! each line into an [`Inbound`] message. Classification happens exactly
//! once, here, so the rest of the bridge only sees typed values.
//!
//! # Envelope classification
//!
//! | Shape                          | Maps to                            |
//! |--------------------------------|------------------------------------|
//! | `id` + `result`/`error`        | [`Inbound::Response`]              |
//! | `method` + `id`                | [`Inbound::Request`]               |
//! | `method`, no `id`              | [`Inbound::Notification`]          |
//! | anything else                  | `Err(AppError::Acp)` for that line |
//!
//! # Known agent methods
//!
//! | Method                       | Maps to                               |
//! |------------------------------|---------------------------------------|
//! | `session/update`             | [`AgentMessage::SessionUpdate`]       |
//! | `session/request_permission` | [`AgentMessage::PermissionRequested`] |
//! | *(other notification)*       | Skipped; logged at `DEBUG`            |
//! | *(other request)*            | [`Inbound::UnsupportedRequest`]       |
//!
//! A request whose params do not decode keeps its id and becomes
//! [`Inbound::InvalidRequest`], so the agent can still be answered.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::debug;

use crate::acp::codec::{AcpCodec, Frame, MAX_LINE_BYTES};
use crate::acp::schema::{PermissionRequest, RequestId, SessionNotification, SessionUpdate};
use crate::{AppError, Result};

// ── Inbound message types ─────────────────────────────────────────────────────

/// A typed message produced by the agent, delivered to the session handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMessage {
    /// `session/update` notification.
    SessionUpdate {
        /// Session the update belongs to.
        session_id: String,
        /// Update payload.
        update: SessionUpdate,
    },
    /// `session/request_permission` request awaiting exactly one reply.
    PermissionRequested {
        /// Id to answer on.
        request_id: RequestId,
        /// Options and context.
        request: PermissionRequest,
    },
}

/// Error object of a response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcError {
    /// Agent-reported code.
    #[serde(default)]
    pub code: i64,
    /// Agent-reported message.
    #[serde(default)]
    pub message: String,
}

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        Self::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// One classified inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Reply to one of our requests.
    Response {
        /// Correlation id as received.
        id: RequestId,
        /// `result` or `error` payload.
        outcome: std::result::Result<Value, RpcError>,
    },
    /// A notification or request the session handler understands.
    Agent(AgentMessage),
    /// An agent request for a method this client does not serve.
    UnsupportedRequest {
        /// Id to answer on.
        id: RequestId,
        /// Requested method.
        method: String,
    },
    /// A known agent request whose params did not decode.
    InvalidRequest {
        /// Id to answer on.
        id: RequestId,
        /// Requested method.
        method: String,
        /// Decode failure.
        message: String,
    },
}

/// Raw envelope, before classification.
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse a single NDJSON line from an ACP agent stream.
///
/// # Return value
///
/// - `Ok(Some(message))`: the line is a recognized, complete message.
/// - `Ok(None)`: the line is empty/whitespace or a notification with an
///   unknown `method` (unknown methods are logged at `DEBUG` level).
///
/// # Errors
///
/// - [`AppError::Acp`]`("malformed json: …")`: not valid JSON.
/// - [`AppError::Acp`]`("invalid envelope: …")`: JSON that is neither a
///   response, a request, nor a notification.
/// - [`AppError::Acp`]`("invalid params: …")`: a known notification whose
///   parameters do not decode. Requests never fail this way; see
///   [`Inbound::InvalidRequest`].
pub fn parse_inbound_line(line: &str) -> Result<Option<Inbound>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let envelope: RawEnvelope =
        serde_json::from_str(line).map_err(|e| AppError::Acp(format!("malformed json: {e}")))?;

    match (envelope.id, envelope.method) {
        (Some(id), None) => {
            let outcome = match (envelope.error, envelope.result) {
                (Some(error), _) => Err(error),
                (None, Some(result)) => Ok(result),
                (None, None) => Ok(Value::Null),
            };
            Ok(Some(Inbound::Response { id, outcome }))
        }
        (Some(id), Some(method)) => parse_request(id, &method, envelope.params),
        (None, Some(method)) => parse_notification(&method, envelope.params),
        (None, None) => Err(AppError::Acp(
            "invalid envelope: neither `id` nor `method` present".into(),
        )),
    }
}

/// Turn an agent's stdout into a lazy stream of classified messages.
///
/// Each item is the outcome for exactly one line. A decode failure is
/// yielded as an `Err` for that line and reading continues with the next
/// one; empty lines and unknown notifications are skipped. The stream ends
/// when stdout closes or an I/O error occurs on it.
pub fn inbound_stream<R>(stdout: R) -> impl Stream<Item = Result<Inbound>>
where
    R: AsyncRead + Unpin + Send,
{
    FramedRead::new(stdout, AcpCodec::new()).filter_map(|frame| async move {
        match frame {
            Ok(Frame::Line(line)) => parse_inbound_line(&line).transpose(),
            Ok(Frame::Oversized) => Some(Err(AppError::Acp(format!(
                "line too long: exceeded {MAX_LINE_BYTES} bytes"
            )))),
            Err(e) => Some(Err(e)),
        }
    })
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Classify an agent-initiated request.
fn parse_request(id: RequestId, method: &str, params: Value) -> Result<Option<Inbound>> {
    match method {
        "session/request_permission" => {
            match serde_json::from_value::<PermissionRequest>(params) {
                Ok(request) => Ok(Some(Inbound::Agent(AgentMessage::PermissionRequested {
                    request_id: id,
                    request,
                }))),
                Err(e) => Ok(Some(Inbound::InvalidRequest {
                    id,
                    method: method.to_owned(),
                    message: e.to_string(),
                })),
            }
        }
        other => Ok(Some(Inbound::UnsupportedRequest {
            id,
            method: other.to_owned(),
        })),
    }
}

/// Classify an agent notification.
fn parse_notification(method: &str, params: Value) -> Result<Option<Inbound>> {
    match method {
        "session/update" => {
            let notification: SessionNotification = serde_json::from_value(params)
                .map_err(|e| AppError::Acp(format!("invalid params: session/update: {e}")))?;
            Ok(Some(Inbound::Agent(AgentMessage::SessionUpdate {
                session_id: notification.session_id,
                update: notification.update,
            })))
        }
        other => {
            debug!(method = other, "acp reader: skipping unknown notification");
            Ok(None)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
