//! Hex-aware framing over any `Read`/`Write` stream.
//!
//! Reads are two-phase: the fixed-size header first, then exactly the body
//! the header's length field announces. The length is validated before the
//! body read, so a hostile or corrupt header can never trigger an oversized
//! or underflowing read. Writes are encode-and-flush, because the peer
//! reads exact counts and blocks until they arrive.

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::hex;
use crate::message::{Encoding, HEADER_SIZE, LEAD_BYTE, declared_len};

/// Streaming message reader with a reusable decode buffer.
///
/// One `Framer` serves a whole session: the buffer is allocated once for
/// `max_message` binary bytes (doubled on the wire in hex mode) and every
/// [`read_message`](Self::read_message) borrows the decoded message from it.
#[derive(Debug)]
pub struct Framer {
    /// Session-wide stream encoding.
    encoding: Encoding,
    /// Largest total binary message length accepted.
    max_message: usize,
    /// Read/decode buffer, `max_message * encoding.width()` bytes.
    buf: Vec<u8>,
}

impl Framer {
    /// Creates a framer for `encoding` accepting messages up to
    /// `max_message` total binary bytes, header included.
    pub fn new(encoding: Encoding, max_message: usize) -> Self {
        assert!(max_message >= HEADER_SIZE, "max_message below header size");
        Self {
            encoding,
            max_message,
            buf: vec![0; max_message * encoding.width()],
        }
    }

    /// Session encoding this framer reads with.
    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Largest total binary message length this framer accepts.
    pub const fn max_message(&self) -> usize {
        self.max_message
    }

    /// Reads one complete message, blocking until it arrives.
    ///
    /// Returns `Ok(None)` when the stream is already at end-of-file, the
    /// normal end of a session. End-of-file anywhere inside a message is an
    /// error, as is a header announcing a total length below [`HEADER_SIZE`]
    /// or above this framer's capacity; the length check runs before any
    /// body byte is read.
    pub fn read_message(&mut self, r: &mut impl Read) -> Result<Option<&[u8]>> {
        let width = self.encoding.width();
        let header_wire = HEADER_SIZE * width;

        let got = read_full(r, &mut self.buf[..header_wire])?;
        if got == 0 {
            return Ok(None);
        }
        if self.encoding == Encoding::Hex {
            // Decode before judging truncation, so an odd character count
            // surfaces as a hex error even when end-of-file cut it short.
            hex::decode_in_place(&mut self.buf[..got])?;
        }
        if got < header_wire {
            return Err(Error::Truncated {
                expected: header_wire,
                got,
            });
        }

        let declared = declared_len(&self.buf[..HEADER_SIZE]);
        let total = declared as usize;
        if total < HEADER_SIZE || total > self.max_message {
            return Err(Error::Framing {
                declared,
                max: self.max_message,
            });
        }

        let body_wire = (total - HEADER_SIZE) * width;
        let read = read_full(r, &mut self.buf[HEADER_SIZE..HEADER_SIZE + body_wire])?;
        if read < body_wire {
            return Err(Error::Truncated {
                expected: header_wire + body_wire,
                got: header_wire + read,
            });
        }
        if self.encoding == Encoding::Hex {
            hex::decode_in_place(&mut self.buf[HEADER_SIZE..HEADER_SIZE + body_wire])?;
        }
        Ok(Some(&self.buf[..total]))
    }
}

/// Writes `bytes` to `w` in `encoding` form and flushes.
///
/// The flush is part of the framing contract, not an optimization knob: the
/// peer blocks on exact counts, so nothing may linger in a writer buffer.
pub fn write_message(w: &mut impl Write, bytes: &[u8], encoding: Encoding) -> Result<()> {
    match encoding {
        Encoding::Binary => w.write_all(bytes).map_err(Error::Write)?,
        Encoding::Hex => w
            .write_all(hex::encode(bytes).as_bytes())
            .map_err(Error::Write)?,
    }
    w.flush().map_err(Error::Write)
}

/// Writes the [`LEAD_BYTE`] primer that precedes each relayed exchange.
pub fn write_lead_byte(w: &mut impl Write, encoding: Encoding) -> Result<()> {
    write_message(w, &[LEAD_BYTE], encoding)
}

/// Reads until `buf` is full or the stream ends, returning the byte count.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Read(e)),
        }
    }
    Ok(filled)
}
