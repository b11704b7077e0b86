/*!
 * vlift Engine
 *
 * This crate provides the operator-facing layer of the vlift system: the
 * shuttle mode dispatcher, the per-(shuttle, mode) operation records, the
 * barcode routing entry point and the measuring-device selection workflow.
 */

#![warn(missing_docs)]

// Re-export core prelude
pub use vlift_core::prelude;

pub mod error;
pub mod measure;
pub mod operation;
pub mod shuttle;

// Re-export the central engine types
pub use error::{Error, Result};
pub use measure::{MeasureLine, MeasuringDevice, Notice, Packaging, SelectOutcome};
pub use operation::{route_barcode, Operation, OperationRegistry, OperationState};
pub use shuttle::{Shuttle, ShuttleMode};

/// vlift engine crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the engine system
pub fn init() -> Result<()> {
    tracing::info!("vlift Engine {} initialized", VERSION);
    Ok(())
}
