//! Recording fakes for the operator collaborators, shared by the unit and
//! integration suites.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use agent_bridge::acp::connection::{HandlerFuture, InboundHandler, Responder};
use agent_bridge::acp::reader::AgentMessage;
use agent_bridge::operator::{OperatorPrompt, ProgressDisplay, SelectFuture, Selection};
use agent_bridge::Result;

/// One call made on a [`RecordingDisplay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    Start(String),
    Update(String),
    Stop(String),
}

/// Display that records every call.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    events: Mutex<Vec<DisplayEvent>>,
    panic_on_progress: bool,
}

impl RecordingDisplay {
    /// Display that panics on the first update carrying completion counts.
    pub fn panicking_on_progress() -> Self {
        Self {
            panic_on_progress: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().expect("display lock").clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DisplayEvent::Update(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<DisplayEvent> {
        self.events().last().cloned()
    }
}

impl ProgressDisplay for RecordingDisplay {
    fn start(&self, text: &str) {
        self.events
            .lock()
            .expect("display lock")
            .push(DisplayEvent::Start(text.to_owned()));
    }

    fn update(&self, text: &str) {
        assert!(
            !(self.panic_on_progress && text.contains(" · ")),
            "display broke on {text:?}"
        );
        self.events
            .lock()
            .expect("display lock")
            .push(DisplayEvent::Update(text.to_owned()));
    }

    fn stop(&self, text: &str) {
        self.events
            .lock()
            .expect("display lock")
            .push(DisplayEvent::Stop(text.to_owned()));
    }
}

/// Prompt that answers from a script and records every question.
///
/// Once the script runs out every further question is cancelled.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<Result<Option<usize>>>>,
    asked: Mutex<Vec<Selection>>,
}

impl ScriptedPrompt {
    pub fn new(answers: Vec<Result<Option<usize>>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            asked: Mutex::new(Vec::new()),
        }
    }


    pub fn choosing(index: usize) -> Self {
        Self::new(vec![Ok(Some(index))])
    }

    pub fn asked(&self) -> Vec<Selection> {
        self.asked.lock().expect("prompt lock").clone()
    }
}

impl OperatorPrompt for ScriptedPrompt {
    fn select(&self, selection: Selection) -> SelectFuture<'_> {
        self.asked.lock().expect("prompt lock").push(selection);
        let answer = self
            .answers
            .lock()
            .expect("prompt lock")
            .pop_front()
            .unwrap_or(Ok(None));
        Box::pin(async move { answer })
    }
}

/// Handler that drops every agent message.
#[derive(Debug, Default)]
pub struct IgnoreMessages;

impl InboundHandler for IgnoreMessages {
    fn on_message<'a>(
        &'a mut self,
        _message: AgentMessage,
        _responder: &'a Responder,
    ) -> HandlerFuture<'a> {
        Box::pin(async {})
    }
}
