/*!
 * Logging functionality for vlift.
 *
 * This module provides tracing setup and utilities for consistent logging
 * across the vlift crates.
 */
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Initialize the logging system with default configuration
pub fn init() -> Result<()> {
    init_with_filter("info")
}

/// Initialize the logging system with a specific filter
///
/// # Arguments
///
/// * `filter` - The log filter string (e.g., "info", "debug", "vlift=trace")
pub fn init_with_filter(filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| Error::runtime(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// A type alias for a tracing span
pub type Span = tracing::Span;

/// Create a new span for a hardware operation
///
/// # Arguments
///
/// * `name` - The name of the operation
/// * `device` - The device the operation targets
pub fn operation_span(name: &str, device: &str) -> Span {
    tracing::info_span!("operation", name = %name, device = %device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        // This will fail if called multiple times in the same process
        // but it's fine for a single test
        let _ = init();
    }

    #[test]
    fn test_operation_span() {
        // Enabled or not (another test may have installed a subscriber),
        // the span must carry the operation metadata.
        let span = operation_span("send_command", "SH1");
        if let Some(metadata) = span.metadata() {
            assert_eq!(metadata.name(), "operation");
        }
    }
}
