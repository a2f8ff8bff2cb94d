//! Relay TPM 2.0 command streams between byte streams and a real TPM.
//!
//! `tpmpipe` moves opaque TPM 2.0 commands from an input stream to a TPM
//! and the responses back to an output stream, interpreting nothing past
//! the 10-byte framing header. Streams may carry raw binary or hex text;
//! the mode is fixed per session and covers both directions. Everything
//! is single-threaded, synchronous, blocking I/O.
//!
//! # Quick start — relaying stdin to the system TPM
//!
//! ```no_run
//! use tpmpipe::{DEFAULT_MAX_MESSAGE, DeviceTransport, Encoding, relay};
//!
//! let mut tpm = DeviceTransport::detect(DEFAULT_MAX_MESSAGE).expect("no TPM device");
//! let mut stdin = std::io::stdin().lock();
//! let mut stdout = std::io::stdout().lock();
//! relay(&mut stdin, &mut stdout, &mut tpm, Encoding::Binary, DEFAULT_MAX_MESSAGE)
//!     .expect("relay failed");
//! ```

mod error;
mod relay;
mod transport;

pub use error::{Error, Result};
pub use relay::{relay, send_one};
pub use tpmpipe_wire::{DEFAULT_MAX_MESSAGE, Encoding};
#[cfg(unix)]
pub use transport::DeviceTransport;
#[cfg(windows)]
pub use transport::TbsTransport;
pub use transport::Transport;
