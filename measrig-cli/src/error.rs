//! CLI error types and exit codes.

use measrig_core::RigError;

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or other non-device errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Device failure - a remote device could not be reached or a remote
    /// command failed
    pub const DEVICE_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Device or remote command error
    #[error("Device error: {0}")]
    Device(String),

    /// Workload generator error
    #[error("Workload error: {0}")]
    Workload(String),

    /// Video pool error
    #[error("Pool error: {0}")]
    Pool(String),

    /// Operation declined at the confirmation prompt
    #[error("Aborted")]
    Aborted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RigError> for CliError {
    fn from(err: RigError) -> Self {
        match err {
            RigError::Configuration(e) => Self::Config(e),
            RigError::Io(e) => Self::Io(e),
            other => Self::Device(other.to_string()),
        }
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, workload, pool, IO, aborted)
    /// - 2: Device failure (transport or remote command)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Device(_) => exit_codes::DEVICE_FAILURE,
            Self::Config(_) | Self::Workload(_) | Self::Pool(_) | Self::Aborted | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}
