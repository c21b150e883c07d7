//! Constants for the fetch module (timeouts, pacing, backoff).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (60 seconds, whole request including body).
pub const READ_TIMEOUT_SECS: u64 = 60;

/// Minimum delay slept before every request, including the first one.
///
/// CourtListener is run by a small nonprofit; three seconds keeps a single
/// client well under its published limits.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(3);

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 8;

/// Default multiplier applied to the delay after each retry wait.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.5;

/// Default ceiling for the computed backoff delay (5 minutes).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Jitter added to each retry wait, as a fraction of the current delay.
pub const JITTER_RATIO: f64 = 0.1;

/// Maximum Retry-After value (1 hour) to prevent excessive delays.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);
