use std::path::Path;

use tracing::{debug, warn};

use crate::corpus::{CorpusError, CorpusLayout, Manifest, save_manifest};

/// Writes `body` to the partial path and renames it to the final artifact path.
///
/// The partial file is removed if either step fails.
pub(super) async fn write_artifact(
    layout: &CorpusLayout,
    opinion_id: u64,
    body: &[u8],
) -> Result<(), CorpusError> {
    let partial = layout.partial_path(opinion_id);
    let target = layout.artifact_path(opinion_id);

    let result = async {
        tokio::fs::write(&partial, body)
            .await
            .map_err(|e| CorpusError::io(&partial, e))?;
        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| CorpusError::io(&target, e))
    }
    .await;

    if result.is_err() {
        discard_partial(&partial).await;
    }
    result
}

pub(super) async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!(path = %partial.display(), "removed partial file"),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => warn!(path = %partial.display(), error = %error, "failed to remove partial file"),
    }
}

/// Saves the manifest mid-run. Failures are logged; the final save reports them.
pub(super) async fn checkpoint(layout: &CorpusLayout, manifest: &Manifest) {
    if let Err(error) = save_manifest(&layout.metadata_path(), manifest).await {
        warn!(error = %error, "manifest checkpoint failed, continuing");
    } else {
        debug!(entries = manifest.len(), "manifest checkpoint saved");
    }
}
