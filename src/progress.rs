//! Progress reporting hooks for search and sync.
//!
//! The library never draws to the terminal itself; the binary plugs in an
//! observer backed by progress bars.

/// Per-artifact result reported during a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// The PDF was fetched and written.
    Downloaded,
    /// The PDF was already on disk.
    Skipped,
    /// Fetching or writing the PDF failed; the run continued.
    Failed,
}

/// Receives progress events. Every method defaults to a no-op.
pub trait ProgressObserver: Send + Sync {
    /// Search collected `found` artifacts so far, out of at most `max`.
    fn search_progress(&self, _found: usize, _max: usize) {}

    /// Sync is about to process `total` artifacts.
    fn sync_started(&self, _total: usize) {}

    /// One artifact finished processing.
    fn artifact_finished(&self, _opinion_id: u64, _outcome: ArtifactOutcome) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}
