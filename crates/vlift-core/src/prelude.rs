/*!
 * Prelude module for vlift Core.
 *
 * This module re-exports commonly used types and functions from the vlift
 * core crate to make them easier to import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export core types
pub use crate::types::{HardwareKind, Id};

// Re-export config types
pub use crate::config::{Config, ConfigBuilder, DeviceConfig, HardwareDefaults, SharedConfig};

// Re-export utility functions
pub use crate::utils::{duration_from_millis, with_timeout};

// Re-export logging macros
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
