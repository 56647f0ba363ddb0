//! Tool-call lifecycle tracking.
//!
//! [`ToolCallTracker`] consumes `tool_call` / `tool_call_update` payloads in
//! arrival order and maintains per-call status plus the session's
//! [`ProgressState`]. Each call moves `started → completed` or
//! `started → failed`; terminal calls never transition again, which makes
//! counting idempotent per call id. An update for an unseen id counts as a
//! fresh start.
//!
//! Calls titled like internal bookkeeping tools are suppressed: they never
//! touch progress, and their entry is dropped on the first terminal status.
//!
//! Every method that changes what the operator should see returns the new
//! display line; the caller pushes it to the display.

pub mod classify;
pub mod progress;

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::acp::schema::{ToolCallStarted, ToolCallStatus, ToolCallUpdated, ToolCategory};
use crate::tracker::classify::{action_label, classify, is_suppressed, ToolClass};
use crate::tracker::progress::{Bucket, ProgressState};

/// Bridge-side lifecycle status of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    /// Seen, not finished.
    Started,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl CallStatus {
    fn is_terminal(self) -> bool {
        !matches!(self, Self::Started)
    }
}

#[derive(Debug, Clone)]
struct CallRecord {
    category: Option<ToolCategory>,
    title: String,
    class: ToolClass,
    status: CallStatus,
}

/// Per-session tool-call state machine.
#[derive(Debug, Default)]
pub struct ToolCallTracker {
    calls: HashMap<String, CallRecord>,
    suppressed: HashSet<String>,
    progress: ProgressState,
}

impl ToolCallTracker {
    /// Tracker with an initial action label and an optional expected number
    /// of external-tool calls for the completion ratio.
    #[must_use]
    pub fn new(initial_action: &str, expected_external_calls: Option<usize>) -> Self {
        Self {
            calls: HashMap::new(),
            suppressed: HashSet::new(),
            progress: ProgressState::new(initial_action, expected_external_calls),
        }
    }

    /// Current aggregate progress.
    #[must_use]
    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    /// Current action label.
    #[must_use]
    pub fn current_action(&self) -> &str {
        &self.progress.action
    }

    /// The line the display should currently show.
    #[must_use]
    pub fn display_line(&self) -> String {
        self.progress.render()
    }

    /// Lifecycle status of a tracked call.
    #[must_use]
    pub fn status(&self, tool_call_id: &str) -> Option<CallStatus> {
        self.calls.get(tool_call_id).map(|record| record.status)
    }

    /// Whether a call id is currently suppressed.
    #[must_use]
    pub fn is_suppressed(&self, tool_call_id: &str) -> bool {
        self.suppressed.contains(tool_call_id)
    }

    /// Number of suppressed ids still awaiting a terminal status.
    #[must_use]
    pub fn suppressed_len(&self) -> usize {
        self.suppressed.len()
    }

    /// Handle a `tool_call` payload.
    pub fn on_started(&mut self, call: &ToolCallStarted) -> Option<String> {
        if self.suppressed.contains(&call.tool_call_id) {
            return self.on_suppressed_status(&call.tool_call_id, call.status);
        }
        if let Some(record) = self.calls.get(&call.tool_call_id) {
            if record.status.is_terminal() {
                debug!(
                    tool_call_id = call.tool_call_id.as_str(),
                    "tracker: start for finished call ignored"
                );
                return None;
            }
        }

        if !self.start(&call.tool_call_id, call.kind, &call.title) {
            return self.on_suppressed_status(&call.tool_call_id, call.status);
        }

        let line = self.progress.render();
        Some(self.apply_status(&call.tool_call_id, call.status).unwrap_or(line))
    }

    /// Handle a `tool_call_update` payload.
    pub fn on_updated(&mut self, update: &ToolCallUpdated) -> Option<String> {
        let id = update.tool_call_id.as_str();

        if self.suppressed.contains(id) {
            return self.on_suppressed_status(id, update.status);
        }
        if self.renamed_to_suppressed(id, update.title.as_deref()) {
            return self.on_suppressed_status(id, update.status);
        }

        let mut line = None;
        match self.calls.get_mut(id) {
            None => {
                let title = update.title.clone().unwrap_or_default();
                if !self.start(id, update.kind, &title) {
                    return self.on_suppressed_status(id, update.status);
                }
                line = Some(self.progress.render());
            }
            Some(record) if record.status == CallStatus::Started => {
                if update.kind.is_some() || update.title.is_some() {
                    if let Some(kind) = update.kind {
                        record.category = Some(kind);
                    }
                    if let Some(title) = &update.title {
                        record.title.clone_from(title);
                    }
                    record.class = classify(record.category, &record.title);
                }
            }
            Some(_) => {}
        }

        self.apply_status(id, update.status).or(line)
    }

    /// Register a started call. Returns `false` when the title is suppressed.
    fn start(&mut self, id: &str, category: Option<ToolCategory>, title: &str) -> bool {
        if is_suppressed(title) {
            debug!(tool_call_id = id, title, "tracker: suppressing bookkeeping call");
            self.suppressed.insert(id.to_owned());
            return false;
        }

        let class = classify(category, title);
        self.calls.insert(
            id.to_owned(),
            CallRecord {
                category,
                title: title.to_owned(),
                class,
                status: CallStatus::Started,
            },
        );
        action_label(class).clone_into(&mut self.progress.action);
        debug!(tool_call_id = id, title, ?class, "tracker: call started");
        true
    }

    /// Move a running call into the suppressed set when an update retitles
    /// it to a bookkeeping title. Finished calls keep their record.
    fn renamed_to_suppressed(&mut self, id: &str, title: Option<&str>) -> bool {
        let Some(title) = title.filter(|title| is_suppressed(title)) else {
            return false;
        };
        let running = self
            .calls
            .get(id)
            .is_some_and(|record| record.status == CallStatus::Started);
        if running {
            debug!(tool_call_id = id, title, "tracker: call retitled as bookkeeping, suppressing");
            self.calls.remove(id);
            self.suppressed.insert(id.to_owned());
        }
        running
    }

    /// Apply a wire status to a tracked, non-suppressed call.
    fn apply_status(&mut self, id: &str, status: Option<ToolCallStatus>) -> Option<String> {
        let record = self.calls.get_mut(id)?;
        if record.status.is_terminal() {
            return None;
        }

        match status {
            Some(ToolCallStatus::Completed) => {
                record.status = CallStatus::Completed;
                let class = record.class;
                if let Some(bucket) = Bucket::for_class(class) {
                    self.progress.increment(bucket);
                }
                if class == ToolClass::ExternalTool {
                    self.progress.unique_external_calls += 1;
                }
                debug!(tool_call_id = id, ?class, "tracker: call completed");
                Some(self.progress.render())
            }
            Some(ToolCallStatus::Failed) => {
                record.status = CallStatus::Failed;
                self.progress.failed += 1;
                warn!(
                    tool_call_id = id,
                    title = record.title.as_str(),
                    "tracker: tool call failed"
                );
                None
            }
            Some(ToolCallStatus::Pending | ToolCallStatus::InProgress) | None => None,
        }
    }

    /// Suppressed ids are forgotten on their first terminal status.
    fn on_suppressed_status(&mut self, id: &str, status: Option<ToolCallStatus>) -> Option<String> {
        if status.is_some_and(ToolCallStatus::is_terminal) {
            self.suppressed.remove(id);
        }
        None
    }
}
