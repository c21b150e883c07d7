//! Retry policy and per-request retry state machine.
//!
//! A failed attempt is classified into a [`FailureType`]:
//! - [`FailureType::Transient`] - 5xx responses, timeouts and connection errors
//! - [`FailureType::RateLimited`] - HTTP 429, optionally carrying a `Retry-After` hint
//! - [`FailureType::Terminal`] - anything else; the request fails at once
//!
//! [`RetryState`] then walks one logical request through
//! `Pending → Waiting → Attempting → {Succeeded, Retrying, Exhausted}`
//! (or `Aborted` on a terminal failure). It owns the current delay, the
//! attempt count and the last error, and performs no I/O itself, so the whole
//! backoff schedule can be exercised without a network.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use opinion_corpus::fetch::{FetchError, RetryDecision, RetryPolicy, RetryState};
//!
//! let policy = RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(10), 2.0);
//! let mut state = RetryState::new(policy, "https://example.com/search/");
//!
//! let wait = state.next_wait();
//! assert_eq!(wait.base, Duration::from_secs(1));
//! state.begin_attempt();
//!
//! let decision = state.fail(FetchError::http_status("https://example.com/search/", 503));
//! assert!(matches!(decision, RetryDecision::Retry));
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;
use super::constants::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
    JITTER_RATIO,
};
use super::retry_after::parse_retry_after;

/// Classification of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: network timeout, connection reset, 5xx server errors.
    Transient,

    /// Server rate limiting (HTTP 429).
    RateLimited,

    /// Failure that won't succeed regardless of retries.
    ///
    /// Examples: 404 Not Found, 400 Bad Request, invalid URL, undecodable body.
    Terminal,
}

/// Backoff configuration shared by every request a client makes.
///
/// # Delay Schedule
///
/// ```text
/// wait(1)     = base_delay
/// wait(n + 1) = delay(n) + jitter,  jitter in [0, 10% of delay(n)]
/// delay(n+1)  = max(delay(n), min(delay(n) * backoff_factor, max_delay))
/// ```
///
/// A `Retry-After` hint larger than the current delay replaces it before the
/// next wait is computed. A hint above `max_delay` stays in force for the
/// remaining retries, so waits never shrink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt.
    max_retries: u32,

    /// Pacing delay slept before every first attempt, and the first backoff delay.
    base_delay: Duration,

    /// Ceiling for the computed delay.
    max_delay: Duration,

    /// Multiplier applied after each retry wait.
    backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    ///
    /// A backoff factor below 1.0 is raised to 1.0 so delays never shrink.
    #[must_use]
    pub fn new(
        max_retries: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_factor: f64,
    ) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay: max_delay.max(base_delay),
            backoff_factor: backoff_factor.max(1.0),
        }
    }

    /// Returns a copy with a different base delay.
    #[must_use]
    pub fn with_base_delay(self, base_delay: Duration) -> Self {
        Self::new(
            self.max_retries,
            base_delay,
            self.max_delay,
            self.backoff_factor,
        )
    }

    /// Returns a copy with a different retry count.
    #[must_use]
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Returns a copy with a different delay ceiling.
    #[must_use]
    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Self::new(
            self.max_retries,
            self.base_delay,
            max_delay,
            self.backoff_factor,
        )
    }

    /// Total attempts allowed, including the initial one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns the pacing delay applied before each request.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the delay ceiling.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    fn escalate(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.backoff_factor).min(self.max_delay).max(delay)
    }
}

/// Where a logical request currently is in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// Created, nothing slept or sent yet.
    Pending,
    /// A wait has been computed; the caller is sleeping.
    Waiting,
    /// An HTTP attempt is in flight.
    Attempting,
    /// The last attempt failed transiently and another is allowed.
    Retrying,
    /// An attempt succeeded.
    Succeeded,
    /// Every allowed attempt failed transiently.
    Exhausted,
    /// An attempt failed with a terminal error.
    Aborted,
}

/// A single wait before an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    /// Backoff delay before jitter.
    pub base: Duration,
    /// Random jitter added on retries (zero before the first attempt).
    pub jitter: Duration,
}

impl Wait {
    /// Total time to sleep.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.base.saturating_add(self.jitter)
    }
}

/// Decision after a failed attempt.
#[derive(Debug)]
pub enum RetryDecision {
    /// Sleep [`RetryState::next_wait`] and try again.
    Retry,

    /// Stop; the error is either terminal or an [`FetchError::ExhaustedRetries`].
    GiveUp(FetchError),
}

/// Per-request retry state: phase, current delay, attempt count, last error.
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    url: String,
    phase: RetryPhase,
    delay: Duration,
    attempts: u32,
    last_error: Option<FetchError>,
}

impl RetryState {
    /// Starts tracking a new logical request.
    #[must_use]
    pub fn new(policy: RetryPolicy, url: impl Into<String>) -> Self {
        Self {
            policy,
            url: url.into(),
            phase: RetryPhase::Pending,
            delay: policy.base_delay,
            attempts: 0,
            last_error: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    /// Attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay that the next retry wait will be based on.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    /// Last error recorded by [`fail`](Self::fail), if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    /// Computes the wait before the next attempt and moves to `Waiting`.
    ///
    /// The first wait is the plain base delay. Each retry wait adds jitter and
    /// then escalates the delay for the following retry.
    pub fn next_wait(&mut self) -> Wait {
        let wait = if self.attempts == 0 {
            Wait {
                base: self.policy.base_delay,
                jitter: Duration::ZERO,
            }
        } else {
            let base = self.delay;
            self.delay = self.policy.escalate(base);
            Wait {
                base,
                jitter: jitter_for(base),
            }
        };
        self.phase = RetryPhase::Waiting;
        wait
    }

    /// Marks the start of an attempt and returns its 1-indexed number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.phase = RetryPhase::Attempting;
        self.attempts
    }

    /// Marks the in-flight attempt as successful.
    pub fn succeed(&mut self) {
        self.phase = RetryPhase::Succeeded;
        self.last_error = None;
    }

    /// Records a failed attempt and decides what happens next.
    #[instrument(skip(self, error), fields(url = %self.url, attempt = self.attempts))]
    pub fn fail(&mut self, error: FetchError) -> RetryDecision {
        let failure_type = classify_error(&error);
        if failure_type == FailureType::Terminal {
            debug!(error = %error, "terminal failure, not retrying");
            self.phase = RetryPhase::Aborted;
            return RetryDecision::GiveUp(error);
        }

        if let Some(hint) = retry_hint(&error)
            && hint > self.delay
        {
            debug!(
                hint_ms = hint.as_millis(),
                delay_ms = self.delay.as_millis(),
                "honoring server Retry-After hint"
            );
            self.delay = hint;
        }

        if self.attempts >= self.policy.max_attempts() {
            debug!(max = self.policy.max_attempts(), "max attempts reached");
            self.phase = RetryPhase::Exhausted;
            return RetryDecision::GiveUp(FetchError::ExhaustedRetries {
                url: self.url.clone(),
                attempts: self.attempts,
                last: Box::new(error),
            });
        }

        self.last_error = Some(error);
        self.phase = RetryPhase::Retrying;
        RetryDecision::Retry
    }
}

/// Classifies a fetch error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | HTTP 429 | RateLimited |
/// | HTTP 5xx | Transient |
/// | Timeout, Network | Transient |
/// | Any other status (3xx, 4xx) | Terminal |
/// | InvalidUrl, MalformedResponse, ClientBuild, ExhaustedRetries | Terminal |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::HttpStatus { status: 429, .. } => FailureType::RateLimited,
        FetchError::HttpStatus { status, .. } if *status >= 500 => FailureType::Transient,
        FetchError::Timeout { .. } | FetchError::Network { .. } => FailureType::Transient,
        FetchError::HttpStatus { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::MalformedResponse { .. }
        | FetchError::ClientBuild { .. }
        | FetchError::ExhaustedRetries { .. } => FailureType::Terminal,
    }
}

fn retry_hint(error: &FetchError) -> Option<Duration> {
    match error {
        FetchError::HttpStatus {
            status: 429,
            retry_after: Some(value),
            ..
        } => parse_retry_after(value),
        _ => None,
    }
}

/// Random jitter in `[0, JITTER_RATIO * delay]`.
fn jitter_for(delay: Duration) -> Duration {
    let fraction: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    delay.mul_f64(fraction * JITTER_RATIO)
}
