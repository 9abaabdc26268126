//! Error types for the robot head motion library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A pose parameter name that the mapping layer does not know
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// A named value that is not present in the parameter's table
    #[error("Unknown value '{value}' for parameter '{parameter}'")]
    UnknownValue {
        /// Parameter the value was looked up for
        parameter: String,
        /// Normalized name that was not found
        value: String,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transient transport failure talking to the hardware daemon
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other failure reported by the hardware boundary
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Whether the control loop should treat this as a connection-class failure
    /// (counted toward backoff and daemon reset).
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Application-specific error type (alias for main Error type)
pub type AppError = Error;

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
