//! Opinion Corpus Library
//!
//! Builds a local corpus of court-opinion PDFs from the CourtListener search
//! API while staying a polite client of a rate-limited public service.
//!
//! # Architecture
//!
//! - [`fetch`] - Paced HTTP GET with exponential backoff and `Retry-After` support
//! - [`search`] - Cursor-paginated search producing artifact descriptors
//! - [`sync`] - Resumable bulk download reconciling disk, manifest and search
//! - [`corpus`] - Corpus directory layout and `metadata.json` persistence
//! - [`progress`] - Observer hooks for progress display

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod corpus;
pub mod fetch;
pub mod progress;
pub mod search;
pub mod sync;
mod user_agent;

// Re-export commonly used types
pub use corpus::{ArtifactDescriptor, CorpusError, CorpusLayout, Manifest, ManifestHeader};
pub use fetch::{
    BackoffRequester, FailureType, FetchError, HttpTimeouts, RetryDecision, RetryPolicy,
    RetryState, classify_error,
};
pub use progress::{ArtifactOutcome, NoProgress, ProgressObserver};
pub use search::{SearchClient, SearchOutcome, SearchRequest, StopReason};
pub use sync::{BulkDownloader, SyncStats};
