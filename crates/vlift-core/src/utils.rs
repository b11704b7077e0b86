/*!
 * Utility functions and helpers for vlift.
 */
use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::{Error, Result};

/// Run a future with an optional timeout
///
/// A `None` duration runs the future to completion. Configured timeouts of
/// zero milliseconds map to `None` (see [`duration_from_millis`]).
///
/// # Arguments
///
/// * `duration` - The timeout duration, if any
/// * `future` - The future to run
///
/// # Returns
///
/// The output of the future, or a timeout error if the timeout is reached
pub async fn with_timeout<F: Future>(duration: Option<Duration>, future: F) -> Result<F::Output> {
    match duration {
        Some(d) => timeout(d, future)
            .await
            .map_err(|_| Error::timeout("Operation timed out")),
        None => Ok(future.await),
    }
}

/// Convert a configured millisecond value to a timeout duration
///
/// Zero means "no timeout" and maps to `None`.
pub fn duration_from_millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}
