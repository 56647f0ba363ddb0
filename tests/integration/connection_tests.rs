//! Integration tests for the protocol connection over in-memory stdio.
//!
//! Covers request/response correlation, error responses, tolerance of bad
//! lines, ordered delivery to the handler, unsupported agent requests, and
//! failure of pending requests when the stream closes.

use std::time::Duration;

use serde_json::{json, Value};

use agent_bridge::acp::connection::{
    Connection, HandlerFuture, InboundHandler, Responder, INVALID_PARAMS, METHOD_NOT_FOUND,
};
use agent_bridge::acp::reader::AgentMessage;
use agent_bridge::acp::schema::{PermissionOutcome, PermissionResponse, SessionUpdate};
use agent_bridge::AppError;

use super::test_helpers::{fake_agent, tool_call, tool_call_status};
use crate::support::IgnoreMessages;

/// Handler that keeps every message and answers permission requests with
/// `cancelled`.
#[derive(Debug, Default)]
struct Collect {
    messages: Vec<AgentMessage>,
}

impl InboundHandler for Collect {
    fn on_message<'a>(
        &'a mut self,
        message: AgentMessage,
        responder: &'a Responder,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            if let AgentMessage::PermissionRequested { request_id, .. } = &message {
                responder
                    .reply(
                        request_id,
                        &PermissionResponse {
                            outcome: PermissionOutcome::Cancelled,
                        },
                    )
                    .await
                    .expect("reply");
            }
            self.messages.push(message);
        })
    }
}

// ── Correlation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn ids_start_at_zero_and_responses_resolve_out_of_order() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let first = connection.request::<_, Value>("test/first", &params);
    let second = connection.request::<_, Value>("test/second", &params);

    let script = async {
        let a = agent.recv().await.expect("first request");
        let b = agent.recv().await.expect("second request");
        assert_eq!(a["id"], 0);
        assert_eq!(b["id"], 1);
        agent.respond(&b, json!({"n": 2})).await;
        agent.respond(&a, json!({"n": 1})).await;
    };

    let (first, second, ()) = tokio::join!(first, second, script);
    assert_eq!(first.expect("first"), json!({"n": 1}));
    assert_eq!(second.expect("second"), json!({"n": 2}));
}

#[tokio::test]
async fn error_response_fails_only_that_request() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let failing = connection.request::<_, Value>("test/fail", &params);
    let script = async {
        let request = agent.recv().await.expect("request");
        agent.respond_error(&request, -32000, "boom").await;
    };
    let (result, ()) = tokio::join!(failing, script);

    assert_eq!(
        result.expect_err("rpc error"),
        AppError::Rpc {
            code: -32000,
            message: "boom".to_owned()
        }
    );

    let ok = connection.request::<_, Value>("test/ok", &params);
    let script = async {
        let request = agent.recv().await.expect("request");
        agent.respond(&request, json!(true)).await;
    };
    let (result, ()) = tokio::join!(ok, script);
    assert_eq!(result.expect("ok"), json!(true));
}

#[tokio::test]
async fn result_that_does_not_decode_is_an_acp_error() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let typed = connection.request::<_, u32>("test/typed", &params);
    let script = async {
        let request = agent.recv().await.expect("request");
        agent.respond(&request, json!("not a number")).await;
    };
    let (result, ()) = tokio::join!(typed, script);

    assert!(matches!(result, Err(AppError::Acp(ref msg)) if msg.contains("test/typed")));
}

// ── Tolerance ─────────────────────────────────────────────────────────────────

/// Garbage, unknown ids and blank lines do not disturb a pending request.
#[tokio::test]
async fn bad_lines_do_not_break_pending_requests() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let pending = connection.request::<_, Value>("test/slow", &params);
    let script = async {
        let request = agent.recv().await.expect("request");
        agent.send_raw("this is not json").await;
        agent.send_raw("").await;
        agent.send_raw(r#"{"jsonrpc":"2.0"}"#).await;
        agent.send(json!({"jsonrpc": "2.0", "id": 4242, "result": {}})).await;
        agent.respond(&request, json!("finally")).await;
    };
    let (result, ()) = tokio::join!(pending, script);

    assert_eq!(result.expect("resolved by its own response"), json!("finally"));
}

// ── Handler delivery ──────────────────────────────────────────────────────────

#[tokio::test]
async fn notifications_reach_the_handler_in_order() {
    let (mut agent, client) = fake_agent();
    let (connection, tasks) = Connection::start(client.stdout, client.stdin, Collect::default());
    let params = json!({});

    agent.update("s1", tool_call("c1", "read", "Read a")).await;
    agent.send_raw("{broken").await;
    agent.update("s1", tool_call_status("c1", "completed")).await;
    agent
        .update("s1", json!({"sessionUpdate": "agent_message_chunk", "content": {"type": "text", "text": "ok"}}))
        .await;

    // A request round-trip guarantees everything before it was dispatched.
    let ping = connection.request::<_, Value>("test/ping", &params);
    let script = async {
        let request = agent.recv().await.expect("ping");
        agent.respond(&request, json!({})).await;
    };
    let (ping, ()) = tokio::join!(ping, script);
    ping.expect("ping");

    connection.close();
    let handler = tasks.reader.await.expect("reader task");

    assert_eq!(handler.messages.len(), 3);
    assert!(matches!(
        &handler.messages[0],
        AgentMessage::SessionUpdate { update: SessionUpdate::ToolCall(call), .. } if call.tool_call_id == "c1"
    ));
    assert!(matches!(
        &handler.messages[1],
        AgentMessage::SessionUpdate { update: SessionUpdate::ToolCallUpdate(_), .. }
    ));
    assert!(matches!(
        &handler.messages[2],
        AgentMessage::SessionUpdate { update: SessionUpdate::AgentMessageChunk { .. }, .. }
    ));
}

#[tokio::test]
async fn permission_request_is_answered_through_the_responder() {
    let (mut agent, client) = fake_agent();
    let (_connection, _tasks) =
        Connection::start(client.stdout, client.stdin, Collect::default());

    agent
        .send(json!({
            "jsonrpc": "2.0",
            "id": 11,
            "method": "session/request_permission",
            "params": {
                "sessionId": "s1",
                "toolCall": {"toolCallId": "c1"},
                "options": [{"optionId": "ok", "name": "Allow", "kind": "allow_once"}]
            }
        }))
        .await;

    let reply = agent.recv().await.expect("reply");
    assert_eq!(
        reply,
        json!({"jsonrpc": "2.0", "id": 11, "result": {"outcome": {"outcome": "cancelled"}}})
    );
}

#[tokio::test]
async fn unsupported_agent_request_gets_method_not_found() {
    let (mut agent, client) = fake_agent();
    let (_connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);

    agent
        .send(json!({"jsonrpc": "2.0", "id": "fs-1", "method": "fs/read_text_file", "params": {"path": "/etc/hosts"}}))
        .await;

    let reply = agent.recv().await.expect("reply");
    assert_eq!(reply["id"], "fs-1");
    assert_eq!(reply["error"]["code"], METHOD_NOT_FOUND);
    assert!(reply.get("result").is_none());
}

#[tokio::test]
async fn undecodable_permission_request_gets_invalid_params() {
    let (mut agent, client) = fake_agent();
    let (_connection, tasks) = Connection::start(client.stdout, client.stdin, Collect::default());

    agent
        .send(json!({
            "jsonrpc": "2.0",
            "id": 12,
            "method": "session/request_permission",
            "params": {
                "sessionId": "s1",
                "toolCall": {"toolCallId": "c1"},
                "options": [{"optionId": "ok", "kind": "allow_once"}]
            }
        }))
        .await;

    let reply = agent.recv().await.expect("agent is answered");
    assert_eq!(reply["id"], 12);
    assert_eq!(reply["error"]["code"], INVALID_PARAMS);
    assert!(reply.get("result").is_none());

    agent.hang_up().await;
    let handler = tasks.reader.await.expect("reader task");
    assert!(handler.messages.is_empty());
}

// ── Closure ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_close_fails_pending_and_later_requests() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let pending = connection.request::<_, Value>("session/prompt", &params);
    let script = async {
        agent.recv().await.expect("request");
        agent.hang_up().await;
    };
    let (result, ()) = tokio::join!(pending, script);

    assert!(matches!(result, Err(AppError::ConnectionClosed(_))));

    let later = tokio::time::timeout(
        Duration::from_secs(5),
        connection.request::<_, Value>("session/prompt", &params),
    )
    .await
    .expect("fails immediately instead of hanging");
    assert!(matches!(later, Err(AppError::ConnectionClosed(_))));
}

#[tokio::test]
async fn close_fails_pending_requests() {
    let (mut agent, client) = fake_agent();
    let (connection, _tasks) = Connection::start(client.stdout, client.stdin, IgnoreMessages);
    let params = json!({});

    let pending = connection.request::<_, Value>("session/prompt", &params);
    let script = async {
        agent.recv().await.expect("request");
        connection.close();
    };
    let (result, ()) = tokio::join!(pending, script);

    assert_eq!(
        result.expect_err("closed"),
        AppError::ConnectionClosed("connection closed by client".to_owned())
    );
}
