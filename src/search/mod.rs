//! Cursor-paginated search over the opinion search API.
//!
//! [`SearchClient::search`] walks the `next` links of the search endpoint and
//! returns at most `max_results` PDF artifacts in service order. A failing page
//! ends pagination early; the artifacts gathered so far are still returned and
//! [`SearchOutcome::stop`] records why it stopped.

mod types;

use tracing::{debug, error, info, instrument};

use crate::corpus::ArtifactDescriptor;
use crate::fetch::{BackoffRequester, FetchError};
use crate::progress::ProgressObserver;

pub use types::{SearchOpinion, SearchPage, SearchResultItem};

/// Default search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://www.courtlistener.com/api/rest/v4/search/";

/// Results requested per page.
pub const PAGE_SIZE: u32 = 20;

/// Result ordering sent with the first request.
const ORDER_BY: &str = "dateFiled desc";

/// Search result type for case-law opinions.
const RESULT_TYPE: &str = "o";

/// Parameters of one search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Full-text query.
    pub query: String,
    /// Upper bound on returned artifacts.
    pub max_results: usize,
    /// Court identifier filter.
    pub court: Option<String>,
    /// Only opinions filed after this `YYYY-MM-DD` date.
    pub filed_after: Option<String>,
}

impl SearchRequest {
    /// Creates a request with no filters.
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            court: None,
            filed_after: None,
        }
    }

    /// Restricts results to one court.
    #[must_use]
    pub fn with_court(mut self, court: Option<String>) -> Self {
        self.court = court;
        self
    }

    /// Restricts results to opinions filed after `date`.
    #[must_use]
    pub fn with_filed_after(mut self, date: Option<String>) -> Self {
        self.filed_after = date;
        self
    }

    fn first_page_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.query.clone()),
            ("type", RESULT_TYPE.to_string()),
            ("order_by", ORDER_BY.to_string()),
            ("page_size", PAGE_SIZE.to_string()),
        ];
        if let Some(court) = &self.court {
            params.push(("court", court.clone()));
        }
        if let Some(filed_after) = &self.filed_after {
            params.push(("filed_after", filed_after.clone()));
        }
        params
    }
}

/// Why pagination stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The last page had no `next` cursor.
    CursorExhausted,
    /// A page returned zero results.
    EmptyPage,
    /// `max_results` artifacts were collected.
    LimitReached,
    /// A request or decode failed; the partial result was kept.
    Failed(FetchError),
}

/// Result of a search.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Collected artifacts, in service order.
    pub artifacts: Vec<ArtifactDescriptor>,
    /// The requested maximum.
    pub requested: usize,
    /// Number of pages successfully fetched.
    pub pages_fetched: usize,
    /// Why pagination stopped.
    pub stop: StopReason,
}

impl SearchOutcome {
    /// Returns true when a failure cut the search short.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_))
    }

    /// How many artifacts fewer than requested were returned.
    #[must_use]
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.artifacts.len())
    }
}

/// Search client bound to one endpoint.
#[derive(Debug, Clone)]
pub struct SearchClient {
    requester: BackoffRequester,
    search_url: String,
}

impl SearchClient {
    /// Creates a client for the default endpoint.
    #[must_use]
    pub fn new(requester: BackoffRequester) -> Self {
        Self::with_base_url(requester, DEFAULT_SEARCH_URL)
    }

    /// Creates a client for a custom endpoint (used by tests and config).
    pub fn with_base_url(requester: BackoffRequester, search_url: impl Into<String>) -> Self {
        Self {
            requester,
            search_url: search_url.into(),
        }
    }

    /// Returns the search endpoint.
    #[must_use]
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Collects up to `request.max_results` PDF artifacts.
    ///
    /// Never fails: errors end pagination and are reported in
    /// [`SearchOutcome::stop`].
    #[instrument(skip(self, request, progress), fields(query = %request.query, max = request.max_results))]
    pub async fn search(
        &self,
        request: &SearchRequest,
        progress: &dyn ProgressObserver,
    ) -> SearchOutcome {
        let mut outcome = SearchOutcome {
            artifacts: Vec::new(),
            requested: request.max_results,
            pages_fetched: 0,
            stop: StopReason::LimitReached,
        };
        if request.max_results == 0 {
            debug!("max_results is zero, skipping search");
            return outcome;
        }

        let first_params = request.first_page_params();
        let mut next_url = Some(self.search_url.clone());
        while let Some(url) = next_url.take() {
            let params = (outcome.pages_fetched == 0).then_some(first_params.as_slice());
            let page = match self.fetch_page(&url, params).await {
                Ok(page) => page,
                Err(fetch_error) => {
                    error!(
                        url = %url,
                        error = %fetch_error,
                        collected = outcome.artifacts.len(),
                        "search failed, keeping partial results"
                    );
                    outcome.stop = StopReason::Failed(fetch_error);
                    return outcome;
                }
            };
            outcome.pages_fetched += 1;

            if page.results.is_empty() {
                debug!(page = outcome.pages_fetched, "empty search page");
                outcome.stop = StopReason::EmptyPage;
                return outcome;
            }

            let artifacts = match page.artifacts(&url) {
                Ok(artifacts) => artifacts,
                Err(fetch_error) => {
                    error!(url = %url, error = %fetch_error, "malformed search page");
                    outcome.stop = StopReason::Failed(fetch_error);
                    return outcome;
                }
            };
            let remaining = request.max_results - outcome.artifacts.len();
            outcome
                .artifacts
                .extend(artifacts.into_iter().take(remaining));

            info!(
                page = outcome.pages_fetched,
                results = page.results.len(),
                found = outcome.artifacts.len(),
                "fetched search page"
            );
            progress.search_progress(outcome.artifacts.len(), request.max_results);

            if outcome.artifacts.len() >= request.max_results {
                outcome.stop = StopReason::LimitReached;
                return outcome;
            }
            next_url = page.next_cursor().map(str::to_string);
        }

        outcome.stop = StopReason::CursorExhausted;
        outcome
    }

    async fn fetch_page(
        &self,
        url: &str,
        params: Option<&[(&str, String)]>,
    ) -> Result<SearchPage, FetchError> {
        self.requester.get(url, params, false).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_page_params_without_filters() {
        let params = SearchRequest::new("patent infringement", 10).first_page_params();
        assert_eq!(
            params,
            vec![
                ("q", "patent infringement".to_string()),
                ("type", "o".to_string()),
                ("order_by", "dateFiled desc".to_string()),
                ("page_size", "20".to_string()),
            ]
        );
    }

    #[test]
    fn test_first_page_params_with_filters() {
        let params = SearchRequest::new("asylum", 10)
            .with_court(Some("ca9".to_string()))
            .with_filed_after(Some("2020-01-01".to_string()))
            .first_page_params();
        assert!(params.contains(&("court", "ca9".to_string())));
        assert!(params.contains(&("filed_after", "2020-01-01".to_string())));
    }

    #[test]
    fn test_outcome_truncation_and_shortfall() {
        let outcome = SearchOutcome {
            artifacts: vec![ArtifactDescriptor::new(1, "pdf/a.pdf")],
            requested: 5,
            pages_fetched: 1,
            stop: StopReason::Failed(FetchError::http_status("https://example.com", 403)),
        };
        assert!(outcome.is_truncated());
        assert_eq!(outcome.shortfall(), 4);

        let complete = SearchOutcome {
            stop: StopReason::CursorExhausted,
            ..outcome
        };
        assert!(!complete.is_truncated());
    }
}
