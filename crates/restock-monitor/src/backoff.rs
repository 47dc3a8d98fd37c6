//! Error back-off schedule for monitor workers.
//!
//! Workers never give up, so there is no retry budget here. The delay grows
//! exponentially with the number of consecutive failures and is capped, so a
//! worker facing a dead proxy pool settles into one attempt per cap interval
//! instead of spinning.

use std::time::Duration;

/// Computes the sleep before the next attempt after `failures` consecutive
/// failures.
///
/// | Failures | Delay (before cap)  |
/// |----------|---------------------|
/// | 0 or 1   | `base`              |
/// | 2        | `base × 2`          |
/// | 3        | `base × 4`          |
///
/// The result never exceeds `cap`.
pub(crate) fn error_backoff(base: Duration, cap: Duration, failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent).min(cap)
}
