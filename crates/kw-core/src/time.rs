//! Time utilities for kernel-warmup

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Get the current Unix timestamp as fractional seconds.
///
/// Returns 0.0 if the system clock is set before the Unix epoch.
///
/// # Examples
/// ```
/// use kw_core::time::current_time_secs_f64;
///
/// let now = current_time_secs_f64();
/// assert!(now > 0.0);
/// ```
pub fn current_time_secs_f64() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}
