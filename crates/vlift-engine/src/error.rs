/*!
 * Error types for the vlift engine crate.
 */
use thiserror::Error;

/// Error type for vlift engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// Hardware error
    #[error("Hardware error: {0}")]
    Hardware(#[from] vlift_hardware::HardwareError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] vlift_core::error::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for vlift engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new not found error
    pub fn not_found<S: AsRef<str>>(msg: S) -> Self {
        Error::NotFound(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        Error::Other(msg.as_ref().to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
