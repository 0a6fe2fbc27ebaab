//! Error handling and exit codes.

use std::io;

use respool_core::PoolError;

/// Process exit codes.
pub mod exit_codes {
    /// Simulation completed.
    pub const SUCCESS: u8 = 0;
    /// Unclassified failure.
    pub const ERROR_GENERIC: u8 = 1;
    /// Writing the report failed.
    pub const ERROR_OUTPUT: u8 = 3;
    /// Invalid flags or environment.
    pub const ERROR_CONFIG: u8 = 4;
}

/// Failures surfaced by the simulator.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Flags that parse but make no sense together.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The registry refused an operation.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Writing the report failed.
    #[error("failed to write report: {0}")]
    Output(#[from] io::Error),
}

/// Map an application error to a process exit code.
pub fn handle_error(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => exit_codes::ERROR_CONFIG,
        Some(AppError::Output(_)) => exit_codes::ERROR_OUTPUT,
        Some(AppError::Pool(_)) | None => exit_codes::ERROR_GENERIC,
    }
}
