//! Session orchestration.
//!
//! Drives one end-to-end invocation of an agent: spawn, handshake, optional
//! model selection, the prompt turn, and guaranteed teardown.

pub mod events;
pub mod model_select;
pub mod session_runner;

pub use session_runner::{run_session, Phase, SessionOutcome, SessionRequest};
