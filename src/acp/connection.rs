//! ACP protocol connection.
//!
//! Turns the raw NDJSON stream of one agent into request/response and
//! notification semantics:
//!
//! - Outbound requests allocate a fresh integer id, are queued to the writer
//!   task, and suspend the caller on a [`oneshot`] until the matching
//!   response arrives or the connection closes.
//! - One read loop consumes [`inbound_stream`]. Responses resolve their
//!   pending caller, agent messages are handed to a single
//!   [`InboundHandler`] in arrival order, and responses for unknown ids are
//!   dropped with a warning.
//! - When the stream ends, every still-pending request fails with
//!   [`AppError::ConnectionClosed`] and later requests fail immediately.
//!
//! The handler is awaited inside the read loop, so no two messages are ever
//! processed concurrently and handler state needs no locking.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::acp::reader::{inbound_stream, AgentMessage, Inbound, RpcError};
use crate::acp::schema::{
    ContentBlock, InitializeParams, InitializeResult, McpServer, NewSessionParams,
    NewSessionResult, PromptParams, PromptResult, RequestId, SetModelParams,
};
use crate::acp::writer::run_writer;
use crate::{AppError, Result};

/// JSON-RPC "method not found" error code.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC "invalid params" error code.
pub const INVALID_PARAMS: i64 = -32602;

/// Capacity of the outbound message queue.
const OUTBOUND_CAPACITY: usize = 64;

/// Boxed future returned by [`InboundHandler::on_message`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Consumer of agent notifications and agent-initiated requests.
///
/// Called sequentially from the connection's read loop; a message is never
/// delivered before the previous call has finished.
pub trait InboundHandler: Send + 'static {
    /// Process one message. Requests must be answered through `responder`.
    fn on_message<'a>(
        &'a mut self,
        message: AgentMessage,
        responder: &'a Responder,
    ) -> HandlerFuture<'a>;
}

/// Write handle for replies to agent-initiated requests.
#[derive(Debug, Clone)]
pub struct Responder {
    tx: mpsc::Sender<Value>,
}

impl Responder {
    /// Send a `{id, result}` response envelope.
    ///
    /// # Errors
    ///
    /// - [`AppError::Acp`] if `result` cannot be serialised.
    /// - [`AppError::ConnectionClosed`] if the writer task has stopped.
    pub async fn reply<T: Serialize>(&self, id: &RequestId, result: &T) -> Result<()> {
        let result = serde_json::to_value(result)
            .map_err(|e| AppError::Acp(format!("failed to serialise reply: {e}")))?;
        self.send(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
            .await
    }

    /// Send a `{id, error}` response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConnectionClosed`] if the writer task has stopped.
    pub async fn reply_error(&self, id: &RequestId, code: i64, message: &str) -> Result<()> {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }))
        .await
    }

    async fn send(&self, value: Value) -> Result<()> {
        self.tx
            .send(value)
            .await
            .map_err(|_| AppError::ConnectionClosed("writer stopped".into()))
    }
}

/// Requests awaiting a response, plus the reason the connection closed.
#[derive(Default)]
struct PendingState {
    waiters: HashMap<u64, oneshot::Sender<Result<Value>>>,
    closed: Option<String>,
}

type PendingMap = Arc<Mutex<PendingState>>;

/// Background tasks owned by a [`Connection`].
#[derive(Debug)]
pub struct ConnectionTasks<H> {
    /// Read loop; yields the handler back once the stream ends or the
    /// connection is closed.
    pub reader: JoinHandle<H>,
    /// Writer task draining the outbound queue into the agent's stdin.
    pub writer: JoinHandle<Result<()>>,
}

/// One protocol session with an agent process.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::Sender<Value>,
    pending: PendingMap,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl std::fmt::Debug for PendingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingState")
            .field("waiters", &self.waiters.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Connection {
    /// Start the read loop and writer task over an agent's stdio.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<R, W, H>(stdout: R, stdin: W, handler: H) -> (Self, ConnectionTasks<H>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        H: InboundHandler,
    {
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let pending: PendingMap = Arc::new(Mutex::new(PendingState::default()));
        let cancel = CancellationToken::new();

        let writer = tokio::spawn(run_writer(stdin, rx, cancel.clone()));
        let reader = tokio::spawn(run_read_loop(
            stdout,
            Arc::clone(&pending),
            Responder { tx: tx.clone() },
            handler,
            cancel.clone(),
        ));

        let connection = Self {
            outbound: tx,
            pending,
            next_id: AtomicU64::new(0),
            cancel,
        };
        (connection, ConnectionTasks { reader, writer })
    }

    /// Handle for writing replies outside the read loop.
    #[must_use]
    pub fn responder(&self) -> Responder {
        Responder {
            tx: self.outbound.clone(),
        }
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`AppError::Rpc`] if the agent answers with an error.
    /// - [`AppError::ConnectionClosed`] if the stream closes first, or was
    ///   already closed.
    /// - [`AppError::Acp`] if the params do not serialise or the result does
    ///   not decode into `T`.
    pub async fn request<P, T>(&self, method: &str, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| AppError::Acp(format!("failed to serialise {method} params: {e}")))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.pending.lock().await;
            if let Some(reason) = &state.closed {
                return Err(AppError::ConnectionClosed(reason.clone()));
            }
            state.waiters.insert(id, tx);
        }

        let envelope = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        if self.outbound.send(envelope).await.is_err() {
            self.pending.lock().await.waiters.remove(&id);
            return Err(AppError::ConnectionClosed("writer stopped".into()));
        }
        debug!(method, request_id = id, "acp connection: request sent");

        let value = rx
            .await
            .map_err(|_| AppError::ConnectionClosed("response channel dropped".into()))??;

        serde_json::from_value(value)
            .map_err(|e| AppError::Acp(format!("invalid {method} result: {e}")))
    }

    /// `initialize` handshake request.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn initialize(&self, params: &InitializeParams) -> Result<InitializeResult> {
        self.request("initialize", params).await
    }

    /// `session/new`: create the session in `cwd` with attached tool servers.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn new_session(
        &self,
        cwd: PathBuf,
        mcp_servers: Vec<McpServer>,
    ) -> Result<NewSessionResult> {
        self.request("session/new", &NewSessionParams { cwd, mcp_servers })
            .await
    }

    /// `session/prompt`: long-lived request that resolves when the turn ends.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn prompt(&self, session_id: &str, prompt: Vec<ContentBlock>) -> Result<PromptResult> {
        let params = PromptParams {
            session_id: session_id.to_owned(),
            prompt,
        };
        self.request("session/prompt", &params).await
    }

    /// `session/set_model`. The acknowledgement payload is ignored.
    ///
    /// # Errors
    ///
    /// See [`Connection::request`].
    pub async fn set_model(&self, session_id: &str, model_id: &str) -> Result<()> {
        let params = SetModelParams {
            session_id: session_id.to_owned(),
            model_id: model_id.to_owned(),
        };
        let _ack: Value = self.request("session/set_model", &params).await?;
        Ok(())
    }

    /// Stop both background tasks. Pending requests fail as closed.
    ///
    /// Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

// ── Read loop ─────────────────────────────────────────────────────────────────

/// Consume the inbound stream until it ends or `cancel` fires, then fail
/// whatever is still pending and hand the handler back.
async fn run_read_loop<R, H>(
    stdout: R,
    pending: PendingMap,
    responder: Responder,
    mut handler: H,
    cancel: CancellationToken,
) -> H
where
    R: AsyncRead + Unpin + Send,
    H: InboundHandler,
{
    let inbound = inbound_stream(stdout);
    futures_util::pin_mut!(inbound);

    let reason = loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("acp connection: closed by client");
                break "connection closed by client".to_owned();
            }

            item = inbound.next() => {
                match item {
                    None => {
                        debug!("acp connection: agent stream closed");
                        break "agent stream closed".to_owned();
                    }
                    Some(Err(AppError::Io(msg))) => {
                        warn!(error = msg.as_str(), "acp connection: stream error, stopping");
                        break format!("agent stream error: {msg}");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "acp connection: dropping undecodable line");
                    }
                    Some(Ok(Inbound::Response { id, outcome })) => {
                        resolve(&pending, &id, outcome).await;
                    }
                    Some(Ok(Inbound::Agent(message))) => {
                        handler.on_message(message, &responder).await;
                    }
                    Some(Ok(Inbound::UnsupportedRequest { id, method })) => {
                        warn!(%id, method = method.as_str(), "acp connection: unsupported agent request");
                        if let Err(e) = responder
                            .reply_error(&id, METHOD_NOT_FOUND, &format!("method not found: {method}"))
                            .await
                        {
                            debug!(error = %e, "acp connection: could not answer unsupported request");
                        }
                    }
                    Some(Ok(Inbound::InvalidRequest { id, method, message })) => {
                        warn!(%id, method = method.as_str(), error = message.as_str(), "acp connection: undecodable agent request");
                        if let Err(e) = responder
                            .reply_error(&id, INVALID_PARAMS, &format!("invalid params: {method}: {message}"))
                            .await
                        {
                            debug!(error = %e, "acp connection: could not answer invalid request");
                        }
                    }
                }
            }
        }
    };

    fail_pending(&pending, &reason).await;
    handler
}

/// Deliver a response to its waiter, or drop it if nobody is waiting.
async fn resolve(
    pending: &PendingMap,
    id: &RequestId,
    outcome: std::result::Result<Value, RpcError>,
) {
    let key = match id {
        RequestId::Number(n) => u64::try_from(*n).ok(),
        RequestId::Text(s) => s.parse::<u64>().ok(),
    };
    let waiter = match key {
        Some(key) => pending.lock().await.waiters.remove(&key),
        None => None,
    };

    let Some(waiter) = waiter else {
        warn!(%id, "acp connection: response for unknown request id, dropping");
        return;
    };

    if waiter.send(outcome.map_err(AppError::from)).is_err() {
        debug!(%id, "acp connection: requester went away before its response");
    }
}

/// Mark the connection closed and fail every outstanding request.
async fn fail_pending(pending: &PendingMap, reason: &str) {
    let waiters: Vec<_> = {
        let mut state = pending.lock().await;
        state.closed = Some(reason.to_owned());
        state.waiters.drain().collect()
    };

    if !waiters.is_empty() {
        debug!(count = waiters.len(), reason, "acp connection: failing pending requests");
    }
    for (_, waiter) in waiters {
        let _ = waiter.send(Err(AppError::ConnectionClosed(reason.to_owned())));
    }
}
