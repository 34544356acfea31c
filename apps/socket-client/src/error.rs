use socket_core::error::{ConfigError, LifecycleError};

use common::ErrorLocation;

use thiserror::Error;

/// Process exit status for a clean run.
pub const EXIT_OK: u8 = 0;

/// Process exit status when the client never reached a stable session.
pub const EXIT_STARTUP_FAILURE: u8 = 1;

/// Process exit status when the close handshake did not finish in time.
pub const EXIT_SHUTDOWN_TIMEOUT: u8 = 2;

/// Errors that end the client process.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session failed or did not shut down cleanly
    #[error(transparent)]
    Session(#[from] LifecycleError),

    /// Log directory could not be resolved or created
    #[error("Log Directory Error: {message} {location}")]
    LogDirectory {
        message: String,
        location: ErrorLocation,
    },

    /// Logger could not be installed
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },
}

impl ClientError {
    /// Exit status for this error.
    ///
    /// An interrupt before streaming began is a requested stop, not a failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Session(LifecycleError::Interrupted { .. }) => EXIT_OK,
            Self::Session(LifecycleError::ShutdownTimeout { .. }) => EXIT_SHUTDOWN_TIMEOUT,
            _ => EXIT_STARTUP_FAILURE,
        }
    }
}
