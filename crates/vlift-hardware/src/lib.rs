/*!
 * vlift Hardware
 *
 * This crate provides the hardware communication layer for the vlift
 * system: the stream transport (plain TCP or TLS), the protocol drivers
 * that frame and validate vendor payloads, and the device session manager
 * that guarantees exclusive access to a physical device.
 */

#![warn(missing_docs)]

// Re-export core prelude
pub use vlift_core::prelude;

pub mod driver;
pub mod drivers;
pub mod error;
pub mod session;
pub mod transport;
pub mod tray;

// Re-export the central hardware types
pub use driver::{Command, CommandKind, CommandOutcome, DriverRegistry, HardwareDriver};
pub use error::{HardwareError, Result};
pub use session::{Session, SessionEvent, SessionGuard, SessionManager};
pub use transport::{ConnectOptions, Connection, Endpoint};

/// vlift hardware crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the hardware system
pub fn init() -> Result<()> {
    tracing::info!("vlift Hardware {} initialized", VERSION);
    Ok(())
}
