//! Line framing for agent stdio.
//!
//! Every ACP message is one UTF-8 line terminated by `\n`. [`AcpCodec`]
//! frames the agent's stdout into [`Frame`]s for
//! [`tokio_util::codec::FramedRead`], capping each line at
//! [`MAX_LINE_BYTES`] so a runaway agent cannot make the bridge buffer
//! without bound.
//!
//! A line over the cap is a [`Frame::Oversized`], not a decoder error.
//! `FramedRead` stops yielding after its decoder fails once, and a single
//! bad line must not end the session.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Longest accepted inbound line: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// One unit read from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, newline stripped.
    Line(String),
    /// A line over [`MAX_LINE_BYTES`]; its content was dropped.
    Oversized,
}

/// Newline-delimited framing with a line-length cap.
///
/// ```rust,ignore
/// use tokio_util::codec::FramedRead;
/// use agent_bridge::acp::codec::AcpCodec;
///
/// let frames = FramedRead::new(child_stdout, AcpCodec::new());
/// ```
#[derive(Debug)]
pub struct AcpCodec(LinesCodec);

impl AcpCodec {
    /// Codec capped at [`MAX_LINE_BYTES`].
    #[must_use]
    pub fn new() -> Self {
        Self(LinesCodec::new_with_max_length(MAX_LINE_BYTES))
    }
}

impl Default for AcpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AcpCodec {
    type Item = Frame;
    type Error = AppError;

    /// `Ok(None)` while no full line is buffered. An over-long line yields a
    /// single [`Frame::Oversized`]; its remaining bytes are skipped by the
    /// calls that follow.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        to_frame(self.0.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        to_frame(self.0.decode_eof(src))
    }
}

impl Encoder<String> for AcpCodec {
    type Error = AppError;

    /// Append `item` and a trailing `\n` to `dst`. The cap does not apply
    /// to outbound lines.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(|e| match e {
            LinesCodecError::MaxLineLengthExceeded => {
                AppError::Acp(format!("line too long: exceeded {MAX_LINE_BYTES} bytes"))
            }
            LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
        })
    }
}

fn to_frame(
    result: std::result::Result<Option<String>, LinesCodecError>,
) -> Result<Option<Frame>> {
    match result {
        Ok(line) => Ok(line.map(Frame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
        Err(LinesCodecError::Io(io_err)) => Err(AppError::Io(io_err.to_string())),
    }
}
