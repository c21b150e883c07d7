//! Backoff-aware HTTP GET used by both search and download.
//!
//! The requester sleeps a pacing delay before every request, retries 429/5xx
//! and transport failures according to its [`RetryPolicy`], and buffers the
//! whole body inside the attempt so a connection dropped mid-body is retried
//! like any other transient failure.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, redirect};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;
use super::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::user_agent;

/// Transport timeouts passed to the underlying HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_secs: CONNECT_TIMEOUT_SECS,
            read_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// A successful response with its body fully read.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// HTTP status (always 2xx).
    pub status: u16,
    /// Final URL after any redirects.
    pub url: String,
    /// Response body.
    pub body: Vec<u8>,
}

impl Fetched {
    /// Decodes the body as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedResponse`] when the body is not valid JSON
    /// or lacks a field `T` requires.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body)
            .map_err(|error| FetchError::malformed(&self.url, error.to_string()))
    }
}

/// HTTP client that retries transient failures with exponential backoff.
///
/// Cheap to clone; the underlying reqwest clients share their connection pools.
///
/// # Example
///
/// ```no_run
/// use opinion_corpus::fetch::{BackoffRequester, HttpTimeouts, RetryPolicy};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let requester = BackoffRequester::new(RetryPolicy::default(), HttpTimeouts::default())?;
/// let page = requester
///     .get("https://www.courtlistener.com/api/rest/v4/search/", Some(&[("q", "asylum".to_string())]), false)
///     .await?;
/// println!("{} bytes", page.body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackoffRequester {
    /// Client that returns 3xx responses as-is.
    direct: Client,
    /// Client that follows redirects.
    following: Client,
    policy: RetryPolicy,
}

impl BackoffRequester {
    /// Creates a requester with the given retry policy and timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientBuild`] if the HTTP client cannot be built.
    #[instrument(level = "debug", skip_all, fields(base_delay_ms = policy.base_delay().as_millis()))]
    pub fn new(policy: RetryPolicy, timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        let direct = build_client(timeouts, redirect::Policy::none())?;
        let following = build_client(timeouts, redirect::Policy::default())?;
        Ok(Self {
            direct,
            following,
            policy,
        })
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Issues one logical GET, retrying transient failures.
    ///
    /// `query` parameters are appended to `url` when given; cursor URLs that
    /// already carry their parameters should pass `None`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` does not parse
    /// - [`FetchError::HttpStatus`] for a terminal status (4xx other than 429,
    ///   or 3xx when `follow_redirects` is false)
    /// - [`FetchError::ExhaustedRetries`] when every attempt failed transiently
    #[instrument(skip(self, query), fields(url = %url))]
    pub async fn get(
        &self,
        url: &str,
        query: Option<&[(&str, String)]>,
        follow_redirects: bool,
    ) -> Result<Fetched, FetchError> {
        let target = match query {
            Some(params) => Url::parse_with_params(url, params),
            None => Url::parse(url),
        }
        .map_err(|_| FetchError::invalid_url(url))?;

        let mut state = RetryState::new(self.policy, target.as_str());
        loop {
            let wait = state.next_wait();
            if state.attempts() > 0 {
                info!(
                    wait_secs = %format!("{:.1}", wait.total().as_secs_f64()),
                    attempt = state.attempts() + 1,
                    max_attempts = self.policy.max_attempts(),
                    "Backing off before retry"
                );
            }
            tokio::time::sleep(wait.total()).await;

            let attempt = state.begin_attempt();
            debug!(attempt, "sending request");
            match self.attempt(&target, follow_redirects).await {
                Ok(fetched) => {
                    state.succeed();
                    return Ok(fetched);
                }
                Err(error) => {
                    warn!(attempt, error = %error, "request failed");
                    match state.fail(error) {
                        RetryDecision::Retry => {}
                        RetryDecision::GiveUp(error) => return Err(error),
                    }
                }
            }
        }
    }

    async fn attempt(&self, url: &Url, follow_redirects: bool) -> Result<Fetched, FetchError> {
        let client = if follow_redirects {
            &self.following
        } else {
            &self.direct
        };

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_transport(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(FetchError::http_status_with_retry_after(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let final_url = response.url().to_string();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_transport(url.as_str(), e))?;

        Ok(Fetched {
            status: status.as_u16(),
            url: final_url,
            body: body.to_vec(),
        })
    }
}

fn build_client(timeouts: HttpTimeouts, redirects: redirect::Policy) -> Result<Client, FetchError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .timeout(Duration::from_secs(timeouts.read_secs))
        .redirect(redirects)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
        .build()
        .map_err(|source| FetchError::ClientBuild { source })
}
