//! User-Agent string for search and storage requests.
//!
//! Identifies the tool and its purpose so the API operator can tell the
//! traffic apart from browsers and scrapers.

/// Default User-Agent for every request (identifies the tool and its pacing).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("opinion-corpus/{version} (legal research corpus builder; rate-limited)")
}
