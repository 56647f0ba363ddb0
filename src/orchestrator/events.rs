//! Inbound dispatch for one session.
//!
//! [`SessionEvents`] is the connection's single [`InboundHandler`]: tool-call
//! updates go to the tracker and the resulting line to the display, agent
//! text is accumulated, and permission requests go to the mediator. It owns
//! all of that state outright because the read loop never runs two messages
//! at once.

use std::sync::Arc;

use tracing::debug;

use crate::acp::connection::{HandlerFuture, InboundHandler, Responder};
use crate::acp::reader::AgentMessage;
use crate::acp::schema::{ContentBlock, SessionUpdate};
use crate::operator::ProgressDisplay;
use crate::permission::PermissionMediator;
use crate::tracker::progress::ProgressState;
use crate::tracker::ToolCallTracker;

/// Per-session notification consumer.
pub struct SessionEvents {
    tracker: ToolCallTracker,
    mediator: PermissionMediator,
    display: Arc<dyn ProgressDisplay>,
    agent_text: String,
    permission_requests: usize,
}

impl std::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEvents")
            .field("tracker", &self.tracker)
            .field("agent_text_len", &self.agent_text.len())
            .field("permission_requests", &self.permission_requests)
            .finish_non_exhaustive()
    }
}

impl SessionEvents {
    /// Consumer writing progress to `display`.
    #[must_use]
    pub fn new(
        tracker: ToolCallTracker,
        mediator: PermissionMediator,
        display: Arc<dyn ProgressDisplay>,
    ) -> Self {
        Self {
            tracker,
            mediator,
            display,
            agent_text: String::new(),
            permission_requests: 0,
        }
    }

    /// Tool-call state so far.
    #[must_use]
    pub fn tracker(&self) -> &ToolCallTracker {
        &self.tracker
    }

    /// Agent reply text received so far.
    #[must_use]
    pub fn agent_text(&self) -> &str {
        &self.agent_text
    }

    /// Number of permission requests answered.
    #[must_use]
    pub fn permission_requests(&self) -> usize {
        self.permission_requests
    }

    /// Final progress and agent text.
    #[must_use]
    pub fn into_parts(self) -> (ProgressState, String) {
        (self.tracker.progress().clone(), self.agent_text)
    }

    fn on_update(&mut self, session_id: &str, update: SessionUpdate) {
        let line = match update {
            SessionUpdate::ToolCall(call) => self.tracker.on_started(&call),
            SessionUpdate::ToolCallUpdate(update) => self.tracker.on_updated(&update),
            SessionUpdate::AgentMessageChunk { content } => {
                if let ContentBlock::Text { text } = content {
                    self.agent_text.push_str(&text);
                }
                None
            }
            SessionUpdate::Other => {
                debug!(session_id, "session events: update ignored");
                None
            }
        };

        if let Some(line) = line {
            self.display.update(&line);
        }
    }
}

impl InboundHandler for SessionEvents {
    fn on_message<'a>(
        &'a mut self,
        message: AgentMessage,
        responder: &'a Responder,
    ) -> HandlerFuture<'a> {
        Box::pin(async move {
            match message {
                AgentMessage::SessionUpdate { session_id, update } => {
                    self.on_update(&session_id, update);
                }
                AgentMessage::PermissionRequested {
                    request_id,
                    request,
                } => {
                    self.permission_requests += 1;
                    let resume_line = self.tracker.display_line();
                    self.mediator
                        .mediate(&request_id, &request, &resume_line, responder)
                        .await;
                }
            }
        })
    }
}
