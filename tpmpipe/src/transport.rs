//! Transport backends that carry one command to a TPM and return its
//! response.
//!
//! Each submission is a complete, independent access cycle: acquire the
//! TPM access layer, submit, release. No session state survives between
//! calls.

use crate::error::Result;

/// A byte-in/byte-out channel to a TPM.
///
/// `submit` blocks until the TPM answers. Commands and responses are
/// opaque; nothing past the framing header is inspected.
pub trait Transport {
    /// Submits one complete command and returns the complete response.
    fn submit(&mut self, command: &[u8]) -> Result<Vec<u8>>;
}

#[cfg(unix)]
mod device {
    use std::fs::OpenOptions;
    use std::io::{self, Read, Write};
    use std::path::{Path, PathBuf};

    use super::Transport;
    use crate::error::{Error, Result};

    /// Kernel device nodes probed by [`DeviceTransport::detect`], in order.
    /// `/dev/tpmrm0` is the kernel resource manager and tolerates other
    /// concurrent clients; the raw device does not.
    const DEVICE_CANDIDATES: &[&str] = &["/dev/tpmrm0", "/dev/tpm0"];

    /// Transport through a Linux TPM character device.
    ///
    /// The device is opened fresh for every submission and released when
    /// the call returns; the kernel driver hands back one complete
    /// response per write.
    #[derive(Debug, Clone)]
    pub struct DeviceTransport {
        /// Device node submitted through.
        path: PathBuf,
        /// Largest response accepted from the device.
        max_response: usize,
    }

    impl DeviceTransport {
        /// Uses the TPM device node at `path`.
        pub fn new(path: impl Into<PathBuf>, max_response: usize) -> Self {
            Self {
                path: path.into(),
                max_response,
            }
        }

        /// Probes the standard kernel device nodes and uses the first one
        /// present.
        pub fn detect(max_response: usize) -> Result<Self> {
            for candidate in DEVICE_CANDIDATES {
                if Path::new(candidate).exists() {
                    tracing::debug!("using TPM device {candidate}");
                    return Ok(Self::new(*candidate, max_response));
                }
            }
            // ENOENT: no device node to open.
            Err(Error::Transport {
                op: "detect",
                code: 2,
            })
        }

        /// Device node this transport submits through.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Transport for DeviceTransport {
        fn submit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
            let mut dev = OpenOptions::new()
                .read(true)
                .write(true)
                .open(&self.path)
                .map_err(|e| {
                    tracing::debug!("open {}: {e}", self.path.display());
                    Error::Transport {
                        op: "open",
                        code: os_code(&e),
                    }
                })?;
            dev.write_all(command).map_err(|e| Error::Transport {
                op: "write",
                code: os_code(&e),
            })?;

            let mut response = vec![0u8; self.max_response];
            let n = dev.read(&mut response).map_err(|e| Error::Transport {
                op: "read",
                code: os_code(&e),
            })?;
            response.truncate(n);
            tracing::debug!(
                "device exchange: {} byte command, {} byte response",
                command.len(),
                n
            );
            Ok(response)
        }
    }

    /// OS status code of an I/O error, `1` when the error carries none.
    #[allow(clippy::cast_sign_loss)]
    fn os_code(e: &io::Error) -> u32 {
        e.raw_os_error().unwrap_or(1) as u32
    }

}

#[cfg(windows)]
mod tbs {
    //! TPM Base Services backend. All `unsafe` code in the crate is
    //! confined to this module.

    #![allow(unsafe_code)]

    use windows_sys::Win32::System::TpmBaseServices::{
        TBS_COMMAND_LOCALITY_ZERO, TBS_COMMAND_PRIORITY_NORMAL, TBS_CONTEXT_PARAMS,
        TBS_CONTEXT_PARAMS2, TBS_CONTEXT_PARAMS2_0, TPM_VERSION_20, Tbsi_Context_Create,
        Tbsip_Context_Close, Tbsip_Submit_Command,
    };

    use super::Transport;
    use crate::error::{Error, Result};

    /// `TBS_CONTEXT_PARAMS2` flag word with only `includeTpm20` set.
    /// Bit 0 is `requestRaw`, bit 1 `includeTpm12`, bit 2 `includeTpm20`.
    const INCLUDE_TPM20: u32 = 0x4;

    /// Transport through the Windows TPM Base Services.
    ///
    /// Every submission creates a fresh TBS context, submits at locality
    /// zero with normal priority, and closes the context before
    /// returning.
    #[derive(Debug, Clone, Copy)]
    pub struct TbsTransport {
        /// Largest response accepted from TBS.
        max_response: usize,
    }

    impl TbsTransport {
        /// Creates a TBS transport for TPM 2.0 devices.
        pub const fn new(max_response: usize) -> Self {
            Self { max_response }
        }
    }

    impl Transport for TbsTransport {
        #[allow(clippy::cast_possible_truncation)]
        fn submit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
            let params = TBS_CONTEXT_PARAMS2 {
                version: TPM_VERSION_20,
                Anonymous: TBS_CONTEXT_PARAMS2_0 {
                    asUINT32: INCLUDE_TPM20,
                },
            };
            let mut ctx = std::ptr::null_mut();
            check("context_create", unsafe {
                Tbsi_Context_Create(
                    std::ptr::addr_of!(params).cast::<TBS_CONTEXT_PARAMS>(),
                    &mut ctx,
                )
            })?;

            let mut response = vec![0u8; self.max_response];
            let mut len = response.len() as u32;
            let submitted = unsafe {
                Tbsip_Submit_Command(
                    ctx,
                    TBS_COMMAND_LOCALITY_ZERO,
                    TBS_COMMAND_PRIORITY_NORMAL,
                    command.as_ptr(),
                    command.len() as u32,
                    response.as_mut_ptr(),
                    &mut len,
                )
            };
            // Close unconditionally; a close failure only matters if the
            // submission itself succeeded.
            let closed = unsafe { Tbsip_Context_Close(ctx) };
            check("submit_command", submitted)?;
            check("context_close", closed)?;

            response.truncate(len as usize);
            tracing::debug!(
                "TBS exchange: {} byte command, {} byte response",
                command.len(),
                len
            );
            Ok(response)
        }
    }

    /// Maps a non-zero `TBS_RESULT` to [`Error::Transport`].
    const fn check(op: &'static str, rc: u32) -> Result<()> {
        if rc == 0 {
            Ok(())
        } else {
            Err(Error::Transport { op, code: rc })
        }
    }
}

#[cfg(unix)]
pub use device::DeviceTransport;
#[cfg(windows)]
pub use tbs::TbsTransport;
