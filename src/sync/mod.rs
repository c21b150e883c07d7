//! Resumable bulk download of opinion PDFs into a corpus directory.
//!
//! A sync reconciles three sources of truth: the artifacts the search
//! returned, the PDFs already on disk, and the existing `metadata.json`.
//! Files already present are never fetched again, and any such file missing
//! from the manifest is added back. Per-artifact failures are counted and
//! skipped so the next run can retry them.

mod persistence;

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::corpus::{
    ArtifactDescriptor, CorpusError, CorpusLayout, Manifest, ManifestHeader,
    list_existing_artifact_ids, load_manifest, remove_partial_files, save_manifest,
};
use crate::fetch::{BackoffRequester, FetchError};
use crate::progress::{ArtifactOutcome, ProgressObserver};

/// Default storage host serving opinion PDFs.
pub const DEFAULT_STORAGE_URL: &str = "https://storage.courtlistener.com";

/// Default number of downloads between manifest checkpoints.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 5;

/// Counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Artifacts fetched and written this run.
    pub downloaded: usize,
    /// Artifacts already on disk.
    pub skipped: usize,
    /// Artifacts that could not be fetched or written.
    pub failed: usize,
    /// Entries in the manifest after the final save.
    pub manifest_entries: usize,
}

/// Downloads artifacts one at a time through a [`BackoffRequester`].
#[derive(Debug, Clone)]
pub struct BulkDownloader {
    requester: BackoffRequester,
    storage_url: Url,
    checkpoint_every: usize,
}

impl BulkDownloader {
    /// Creates a downloader for the default storage host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] only if the built-in host is invalid.
    pub fn new(requester: BackoffRequester) -> Result<Self, FetchError> {
        Self::with_storage_url(requester, DEFAULT_STORAGE_URL)
    }

    /// Creates a downloader for a custom storage host.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if `storage_url` does not parse.
    pub fn with_storage_url(
        requester: BackoffRequester,
        storage_url: &str,
    ) -> Result<Self, FetchError> {
        let storage_url = Url::parse(storage_url).map_err(|_| FetchError::invalid_url(storage_url))?;
        Ok(Self {
            requester,
            storage_url,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        })
    }

    /// Saves the manifest after every `every` downloads; 0 saves only at the end.
    #[must_use]
    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every;
        self
    }

    /// Full download URL for a storage-relative path.
    #[must_use]
    pub fn artifact_url(&self, local_path: &str) -> String {
        format!(
            "{}/{}",
            self.storage_url.as_str().trim_end_matches('/'),
            local_path.trim_start_matches('/')
        )
    }

    /// Downloads every artifact not already on disk and rewrites the manifest.
    ///
    /// The manifest header is replaced with `header`; existing entries are kept.
    ///
    /// # Errors
    ///
    /// Returns [`CorpusError`] if the corpus directory cannot be prepared, the
    /// existing manifest cannot be parsed, or the final manifest save fails.
    /// Individual download failures are counted in [`SyncStats::failed`].
    #[instrument(skip_all, fields(corpus = %header.corpus, artifacts = artifacts.len()))]
    pub async fn sync(
        &self,
        layout: &CorpusLayout,
        header: ManifestHeader,
        artifacts: &[ArtifactDescriptor],
        progress: &dyn ProgressObserver,
    ) -> Result<SyncStats, CorpusError> {
        let opinions_dir = layout.opinions_dir();
        tokio::fs::create_dir_all(&opinions_dir)
            .await
            .map_err(|e| CorpusError::io(&opinions_dir, e))?;
        remove_partial_files(&opinions_dir).await?;

        let metadata_path = layout.metadata_path();
        let mut manifest = match load_manifest(&metadata_path).await? {
            Some(mut manifest) => {
                manifest.set_header(header);
                manifest
            }
            None => Manifest::new(header),
        };
        let mut on_disk = list_existing_artifact_ids(&opinions_dir).await?;
        info!(
            existing_files = on_disk.len(),
            manifest_entries = manifest.len(),
            "resuming corpus"
        );

        let mut stats = SyncStats::default();
        let mut since_checkpoint = 0;
        progress.sync_started(artifacts.len());

        for artifact in artifacts {
            let outcome = self
                .process(layout, artifact, &mut on_disk, &mut manifest)
                .await;
            match outcome {
                ArtifactOutcome::Downloaded => {
                    stats.downloaded += 1;
                    since_checkpoint += 1;
                    if self.checkpoint_every > 0 && since_checkpoint >= self.checkpoint_every {
                        persistence::checkpoint(layout, &manifest).await;
                        since_checkpoint = 0;
                    }
                }
                ArtifactOutcome::Skipped => stats.skipped += 1,
                ArtifactOutcome::Failed => stats.failed += 1,
            }
            progress.artifact_finished(artifact.opinion_id, outcome);
        }

        save_manifest(&metadata_path, &manifest).await?;
        stats.manifest_entries = manifest.len();
        info!(
            downloaded = stats.downloaded,
            skipped = stats.skipped,
            failed = stats.failed,
            total = stats.manifest_entries,
            "sync complete"
        );
        Ok(stats)
    }

    async fn process(
        &self,
        layout: &CorpusLayout,
        artifact: &ArtifactDescriptor,
        on_disk: &mut HashSet<u64>,
        manifest: &mut Manifest,
    ) -> ArtifactOutcome {
        let opinion_id = artifact.opinion_id;
        if on_disk.contains(&opinion_id) {
            if manifest.insert_if_absent(artifact.clone()) {
                debug!(opinion_id, "file on disk but missing from manifest, re-added");
            }
            return ArtifactOutcome::Skipped;
        }

        let url = self.artifact_url(&artifact.local_path);
        let fetched = match self.requester.get(&url, None, true).await {
            Ok(fetched) => fetched,
            Err(error) => {
                warn!(opinion_id, url = %url, error = %error, "download failed");
                persistence::discard_partial(&layout.partial_path(opinion_id)).await;
                return ArtifactOutcome::Failed;
            }
        };

        if let Err(error) = persistence::write_artifact(layout, opinion_id, &fetched.body).await {
            warn!(opinion_id, url = %url, error = %error, "failed to write artifact");
            return ArtifactOutcome::Failed;
        }

        manifest.upsert(artifact.clone());
        on_disk.insert(opinion_id);
        debug!(opinion_id, bytes = fetched.body.len(), "downloaded artifact");
        ArtifactOutcome::Downloaded
    }
}
