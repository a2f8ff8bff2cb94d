//! Hex text codec with in-place stream decoding.
//!
//! Output is lowercase; decoding accepts either case. The in-place form
//! collapses hex text at the head of a buffer into binary, so a stream
//! reader can decode into the same allocation it read into.

/// Errors produced by the hex codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum HexError {
    /// The text's character count is not a multiple of two.
    #[error("hex text has odd length {0}")]
    OddLength(usize),

    /// A character outside `[0-9a-fA-F]` appeared in the text.
    #[error("invalid hex digit {byte:#04x} at offset {offset}")]
    InvalidDigit {
        /// The offending input byte.
        byte: u8,
        /// Its position in the input text.
        offset: usize,
    },
}

/// Value of one hex digit, or `None` for a non-digit byte.
const fn nibble(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Encodes `bytes` as lowercase hex text.
pub fn encode(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";

    let mut text = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        text.push(char::from(DIGITS[usize::from(b >> 4)]));
        text.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    text
}

/// Decodes hex text into a fresh byte vector.
pub fn decode(text: &[u8]) -> Result<Vec<u8>, HexError> {
    let mut buf = text.to_vec();
    let len = decode_in_place(&mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

/// Decodes the hex text in `buf` into its own leading bytes.
///
/// On success the first `buf.len() / 2` bytes hold the binary form and the
/// returned count is that length; the remainder of `buf` is left as-is.
pub fn decode_in_place(buf: &mut [u8]) -> Result<usize, HexError> {
    if buf.len() % 2 != 0 {
        return Err(HexError::OddLength(buf.len()));
    }
    for i in 0..buf.len() / 2 {
        let (hi, lo) = (buf[2 * i], buf[2 * i + 1]);
        let hi = nibble(hi).ok_or(HexError::InvalidDigit { byte: hi, offset: 2 * i })?;
        let lo = nibble(lo).ok_or(HexError::InvalidDigit { byte: lo, offset: 2 * i + 1 })?;
        buf[i] = (hi << 4) | lo;
    }
    Ok(buf.len() / 2)
}
