//! Agent Client Protocol (ACP) stream handling.
//!
//! This module manages bidirectional NDJSON stream communication with the
//! agent process spawned for one session.
//!
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based stream framing for NDJSON messages.
//! - `schema`: Typed request, response and notification payloads.
//! - `reader`: Envelope classification and the inbound message stream.
//! - `writer`: Async write task that serializes outbound messages to the agent.
//! - `connection`: Request correlation and the notification read loop.
//! - `handshake`: `initialize` / `session/new` opening exchange.
//! - `spawner`: Process spawning and teardown.

pub mod codec;
pub mod connection;
pub mod handshake;
pub mod reader;
pub mod schema;
pub mod spawner;
pub mod writer;
