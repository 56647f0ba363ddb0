#![forbid(unsafe_code)]

//! `agent-bridge`: drives ACP coding agents over stdio.
//!
//! Spawns an agent, speaks the Agent Client Protocol with it, turns its
//! tool-call notifications into a live progress line, and mediates its
//! permission requests through the operator.

pub mod acp;
pub mod agents;
pub mod config;
pub mod errors;
pub mod operator;
pub mod orchestrator;
pub mod permission;
pub mod runtime;
pub mod tracker;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
