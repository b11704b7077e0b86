/*!
 * Error types for the vlift hardware crate.
 */
use thiserror::Error;

use vlift_core::types::{HardwareKind, Id};

/// Error type for hardware operations
#[derive(Error, Debug)]
pub enum HardwareError {
    /// The connection to the device could not be established (socket or
    /// TLS handshake failure)
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The stream failed mid-transfer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A network operation exceeded its configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The device is held by another session
    #[error("Device {0} is already in use")]
    AlreadyLocked(Id),

    /// The outbound payload could not be built
    #[error("Payload error: {0}")]
    Payload(String),

    /// No driver is registered for the hardware kind
    #[error("No driver registered for hardware kind {0}")]
    UnsupportedHardware(HardwareKind),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for hardware operations
pub type Result<T> = std::result::Result<T, HardwareError>;

impl HardwareError {
    /// Create a new connection error
    pub fn connect<S: AsRef<str>>(msg: S) -> Self {
        HardwareError::Connect(msg.as_ref().to_string())
    }

    /// Create a new timeout error
    pub fn timeout<S: AsRef<str>>(msg: S) -> Self {
        HardwareError::Timeout(msg.as_ref().to_string())
    }

    /// Create a new payload error
    pub fn payload<S: AsRef<str>>(msg: S) -> Self {
        HardwareError::Payload(msg.as_ref().to_string())
    }

    /// Create a new other error
    pub fn other<S: AsRef<str>>(msg: S) -> Self {
        HardwareError::Other(msg.as_ref().to_string())
    }
}
