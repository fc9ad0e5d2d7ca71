//! Error types shared across the rig control layer.
//!
//! Every failure is a single explicit signal at the call site; nothing in
//! this crate retries transparently or logs-and-continues, with one
//! documented exception (un-announce, see [`crate::device::Device::rm_announce`]).

use thiserror::Error;

/// Errors raised by transports, devices, and feature compositions
#[derive(Debug, Error)]
pub enum RigError {
    /// Transport-level failure: connection refused, authentication failure,
    /// or the transport process could not be started at all
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote command ran but exited non-zero
    #[error("remote command exited with status {code}: {stderr}")]
    Execution {
        /// Remote exit code
        code: i32,
        /// Captured stderr of the remote command
        stderr: String,
    },

    /// Invalid or missing configuration, checked before any network
    /// round-trip (e.g. elevation requested without a secret)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Output was requested from a process that has not terminated yet
    #[error("remote process {0} is still running")]
    StillRunning(u32),

    /// A save was requested for a feature that never recorded an output file
    #[error("feature '{0}' has no output file to save")]
    NoOutput(String),

    /// Local I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RigError {
    /// Returns true for remote-command failures (non-zero exit), as opposed
    /// to transport, configuration, or local errors.
    ///
    /// Used where a non-zero exit is tolerable (best-effort kill, marker
    /// removal, non-critical clock sync) but other failures still propagate.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }
}

/// Result type alias for rig operations
pub type RigResult<T> = Result<T, RigError>;
