//! Resilient HTTP fetching for a rate-limited public API.
//!
//! # Features
//!
//! - Pacing delay before every request (the client never bursts)
//! - Exponential backoff with jitter on 429, 5xx and transport failures
//! - `Retry-After` hints honored when larger than the computed delay
//! - Explicit, network-free retry state machine ([`RetryState`])
//! - Structured error types carrying the failing URL

mod constants;
mod error;
mod requester;
mod retry;
mod retry_after;

pub use constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_BACKOFF_FACTOR, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY,
    DEFAULT_MAX_RETRIES, MAX_RETRY_AFTER, READ_TIMEOUT_SECS,
};
pub use error::FetchError;
pub use requester::{BackoffRequester, Fetched, HttpTimeouts};
pub use retry::{FailureType, RetryDecision, RetryPhase, RetryPolicy, RetryState, Wait, classify_error};
pub use retry_after::parse_retry_after;
