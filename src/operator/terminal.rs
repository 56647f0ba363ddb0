//! Terminal implementations of the operator collaborators.
//!
//! [`TerminalDisplay`] keeps a single status line on stderr, redrawn in place
//! when stderr is a TTY and printed as plain lines otherwise.
//! [`TerminalPrompt`] runs a `dialoguer` select on a blocking thread.

use std::io::{IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use dialoguer::Select;

use crate::operator::{OperatorPrompt, ProgressDisplay, SelectFuture, Selection};
use crate::AppError;

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Default)]
struct DisplayState {
    active: bool,
    frame: usize,
    text: String,
}

/// Status line on stderr.
#[derive(Debug)]
pub struct TerminalDisplay {
    state: Mutex<DisplayState>,
    interactive: bool,
}

impl TerminalDisplay {
    /// Display bound to this process's stderr.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DisplayState::default()),
            interactive: std::io::stderr().is_terminal(),
        }
    }

    fn draw(&self, state: &mut DisplayState) {
        let mut err = std::io::stderr().lock();
        if self.interactive {
            let glyph = SPINNER_FRAMES[state.frame % SPINNER_FRAMES.len()];
            state.frame = state.frame.wrapping_add(1);
            let _ = write!(err, "\r\x1b[2K{glyph} {}", state.text);
        } else {
            let _ = writeln!(err, "{}", state.text);
        }
        let _ = err.flush();
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressDisplay for TerminalDisplay {
    fn start(&self, text: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.active = true;
        text.clone_into(&mut state.text);
        self.draw(&mut state);
    }

    fn update(&self, text: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.active || state.text == text {
            return;
        }
        text.clone_into(&mut state.text);
        self.draw(&mut state);
    }

    fn stop(&self, text: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let was_active = std::mem::replace(&mut state.active, false);
        let mut err = std::io::stderr().lock();
        if was_active && self.interactive {
            let _ = write!(err, "\r\x1b[2K");
        }
        if !text.is_empty() {
            let _ = writeln!(err, "{text}");
        }
        let _ = err.flush();
    }
}

/// `dialoguer` single-select prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl OperatorPrompt for TerminalPrompt {
    fn select(&self, selection: Selection) -> SelectFuture<'_> {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                Select::new()
                    .with_prompt(&selection.title)
                    .items(&selection.items)
                    .default(selection.default)
                    .interact_opt()
                    .map_err(|err| AppError::Io(format!("prompt failed: {err}")))
            })
            .await
            .map_err(|err| AppError::Io(format!("prompt task panicked: {err}")))?
        })
    }
}
