//! Error types for tpmpipe operations.

/// Alias for `Result<T, tpmpipe::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by relay and transport operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The TPM access layer refused or failed a submission.
    #[error("{op}: TPM access layer status {code:#x}")]
    Transport {
        /// The transport operation that failed.
        op: &'static str,
        /// Status code reported by the access layer (OS errno or TBS
        /// result). Becomes the process exit status in the CLI.
        code: u32,
    },

    /// A wire-level framing or transcoding failure.
    #[error(transparent)]
    Wire(#[from] tpmpipe_wire::Error),
}
