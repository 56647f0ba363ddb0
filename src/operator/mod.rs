//! Operator-facing collaborators: the live progress display and the
//! single-select prompt.
//!
//! The bridge only depends on these traits; [`terminal`] provides the
//! stderr/`dialoguer` implementations used by the binary.

pub mod terminal;

use std::future::Future;
use std::pin::Pin;

use crate::Result;

/// Live progress indicator.
///
/// Calls never block on the operator and never fail; implementations swallow
/// their own I/O errors.
pub trait ProgressDisplay: Send + Sync {
    /// Show the indicator with `text`.
    fn start(&self, text: &str);
    /// Replace the indicator text. Ignored while stopped.
    fn update(&self, text: &str);
    /// Remove the indicator, leaving `text` as a final line when non-empty.
    fn stop(&self, text: &str);
}

/// One single-select question for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Question shown above the items.
    pub title: String,
    /// Mutually exclusive items.
    pub items: Vec<String>,
    /// Index highlighted initially.
    pub default: usize,
}

/// Boxed future returned by [`OperatorPrompt::select`].
pub type SelectFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<usize>>> + Send + 'a>>;

/// Blocking single-select prompt.
pub trait OperatorPrompt: Send + Sync {
    /// Ask the operator to pick one item.
    ///
    /// Resolves to `Ok(Some(index))` for a choice and `Ok(None)` when the
    /// operator cancels.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`](crate::AppError::Io) when the terminal cannot
    /// be used.
    fn select(&self, selection: Selection) -> SelectFuture<'_>;
}
