//! Error types for wire-level framing.

use std::io;

use crate::hex::HexError;

/// Alias for `Result<T, tpmpipe_wire::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by message framing and stream transcoding.
///
/// End-of-stream at a message boundary is not an error; readers report it
/// as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The stream ended inside a message.
    #[error("stream ended mid-message: expected {expected} wire bytes, got {got}")]
    Truncated {
        /// Wire bytes the message needed.
        expected: usize,
        /// Wire bytes received before end-of-stream.
        got: usize,
    },

    /// The header declares a length no valid message can have.
    #[error("header declares an invalid length of {declared} bytes (capacity {max})")]
    Framing {
        /// Total length announced by the header.
        declared: u32,
        /// Largest total message length the reader accepts.
        max: usize,
    },

    /// Hex text on the stream failed to decode.
    #[error(transparent)]
    Hex(#[from] HexError),

    /// Reading from the input stream failed.
    #[error("stream read failed")]
    Read(#[source] io::Error),

    /// Writing to the output stream failed.
    #[error("stream write failed")]
    Write(#[source] io::Error),
}
