//! Permission mediation.
//!
//! When the agent asks for permission, the live display is paused, the
//! request's options are put to the operator, and exactly one reply goes
//! back on the connection: the chosen option, or `cancelled` when the
//! operator declines or the prompt itself fails. The display then resumes
//! with the last known progress line.

use std::sync::Arc;

use tracing::{info, warn};

use crate::acp::connection::Responder;
use crate::acp::schema::{
    PermissionOptionKind, PermissionOutcome, PermissionRequest, PermissionResponse, RequestId,
};
use crate::operator::{OperatorPrompt, ProgressDisplay, Selection};

/// Pauses progress, asks the operator, and answers the agent.
pub struct PermissionMediator {
    prompt: Arc<dyn OperatorPrompt>,
    display: Arc<dyn ProgressDisplay>,
}

impl std::fmt::Debug for PermissionMediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionMediator").finish_non_exhaustive()
    }
}

impl PermissionMediator {
    /// Mediator over the given collaborators.
    #[must_use]
    pub fn new(prompt: Arc<dyn OperatorPrompt>, display: Arc<dyn ProgressDisplay>) -> Self {
        Self { prompt, display }
    }

    /// Resolve one permission request and reply to it.
    ///
    /// `resume_line` is what the display shows again afterwards. Returns the
    /// outcome that was sent.
    pub async fn mediate(
        &self,
        request_id: &RequestId,
        request: &PermissionRequest,
        resume_line: &str,
        responder: &Responder,
    ) -> PermissionOutcome {
        self.display.stop("");

        let outcome = self.ask(request).await;

        match &outcome {
            PermissionOutcome::Selected { option_id } => info!(
                %request_id,
                tool_call_id = request.tool_call.tool_call_id.as_str(),
                option_id = option_id.as_str(),
                "permission: option selected"
            ),
            PermissionOutcome::Cancelled => info!(
                %request_id,
                tool_call_id = request.tool_call.tool_call_id.as_str(),
                "permission: cancelled by operator"
            ),
        }

        let response = PermissionResponse {
            outcome: outcome.clone(),
        };
        if let Err(err) = responder.reply(request_id, &response).await {
            warn!(%request_id, %err, "permission: reply could not be sent");
        }

        self.display.start(resume_line);
        outcome
    }

    async fn ask(&self, request: &PermissionRequest) -> PermissionOutcome {
        if request.options.is_empty() {
            warn!(
                tool_call_id = request.tool_call.tool_call_id.as_str(),
                "permission: request has no options"
            );
            return PermissionOutcome::Cancelled;
        }

        let selection = permission_selection(request);
        match self.prompt.select(selection).await {
            Ok(Some(index)) => request.options.get(index).map_or(
                PermissionOutcome::Cancelled,
                |option| PermissionOutcome::Selected {
                    option_id: option.option_id.clone(),
                },
            ),
            Ok(None) => PermissionOutcome::Cancelled,
            Err(err) => {
                warn!(%err, "permission: prompt failed, answering cancelled");
                PermissionOutcome::Cancelled
            }
        }
    }
}

/// Build the operator question for a permission request.
#[must_use]
pub fn permission_selection(request: &PermissionRequest) -> Selection {
    let subject = request
        .tool_call
        .title
        .as_deref()
        .unwrap_or(request.tool_call.tool_call_id.as_str());

    let items = request
        .options
        .iter()
        .map(|option| match option.kind.and_then(PermissionOptionKind::hint) {
            Some(hint) => format!("{} ({hint})", option.name),
            None => option.name.clone(),
        })
        .collect();

    Selection {
        title: format!("Allow {subject}?"),
        items,
        default: 0,
    }
}
