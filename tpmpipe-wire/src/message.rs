//! Message layout constants and the session-wide encoding mode.

/// Fixed size of a TPM 2.0 command/response header, in binary bytes.
pub const HEADER_SIZE: usize = 10;

/// Byte offset of the big-endian `u32` total-length field in the header.
pub const LEN_OFFSET: usize = 2;

/// Default upper bound on a message's total binary length.
pub const DEFAULT_MAX_MESSAGE: usize = 4096;

/// Primer byte written to the output stream before each relayed exchange.
///
/// Every TPM 2.0 response tag begins with `0x80`, so a reader blocked on
/// the response stream can consume this byte as the start of the upcoming
/// response while the command is still being serviced. The real response
/// is then forwarded from its second byte.
pub const LEAD_BYTE: u8 = 0x80;

/// How messages appear on the byte stream.
///
/// The mode is fixed for a whole session and applies to both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum Encoding {
    /// Raw binary, one stream byte per message byte.
    #[default]
    Binary,
    /// Lowercase hex text, two stream characters per message byte.
    Hex,
}

impl Encoding {
    /// Stream bytes occupied by one binary message byte.
    pub const fn width(self) -> usize {
        match self {
            Self::Binary => 1,
            Self::Hex => 2,
        }
    }
}

/// Reads the total message length a header declares.
///
/// `header` must hold at least the first [`LEN_OFFSET`]` + 4` header bytes.
/// The value counts the header itself and is untrusted until checked
/// against [`HEADER_SIZE`] and the reader's capacity.
pub const fn declared_len(header: &[u8]) -> u32 {
    u32::from_be_bytes([
        header[LEN_OFFSET],
        header[LEN_OFFSET + 1],
        header[LEN_OFFSET + 2],
        header[LEN_OFFSET + 3],
    ])
}
