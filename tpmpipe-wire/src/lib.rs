//! Wire format for TPM 2.0 command/response byte streams.
//!
//! Messages are opaque TPM 2.0 blobs: a fixed [`HEADER_SIZE`]-byte header
//! whose bytes `2..6` hold the total message length as a big-endian `u32`,
//! followed by the body. A stream carries them either as raw binary or as
//! hex text ([`Encoding`]); framing is length-delimited and hex-aware,
//! suitable for any reliable byte stream (pipe, file, socket).

mod error;
mod frame;
mod hex;
mod message;

pub use error::{Error, Result};
pub use frame::{Framer, write_lead_byte, write_message};
pub use hex::{HexError, decode, decode_in_place, encode};
pub use message::{DEFAULT_MAX_MESSAGE, Encoding, HEADER_SIZE, LEAD_BYTE, LEN_OFFSET, declared_len};
