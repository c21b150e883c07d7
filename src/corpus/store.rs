//! Disk operations on a corpus directory.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::error::CorpusError;
use super::manifest::{Manifest, ManifestFile, artifact_file_name};

const PARTIAL_EXTENSION: &str = "part";
const ARTIFACT_EXTENSION: &str = "pdf";

/// Loads `metadata.json` if it exists.
///
/// Duplicate `opinion_id` entries in the file collapse to the last one.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] if the file exists but cannot be read and
/// [`CorpusError::Manifest`] if it is not a valid manifest.
pub async fn load_manifest(path: &Path) -> Result<Option<Manifest>, CorpusError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(CorpusError::io(path, error)),
    };
    let file: ManifestFile =
        serde_json::from_slice(&bytes).map_err(|source| CorpusError::manifest(path, source))?;
    let manifest = Manifest::from_file(file);
    debug!(path = %path.display(), entries = manifest.len(), "loaded manifest");
    Ok(Some(manifest))
}

/// Writes the manifest as pretty JSON, replacing any previous file atomically.
///
/// The document is written to a `.tmp` sibling first and renamed into place,
/// so a crash mid-write leaves the previous manifest intact.
///
/// # Errors
///
/// Returns [`CorpusError`] if serialization or any file operation fails.
pub async fn save_manifest(path: &Path, manifest: &Manifest) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CorpusError::io(parent, e))?;
    }

    let mut json = serde_json::to_string_pretty(&manifest.to_file())
        .map_err(|source| CorpusError::manifest(path, source))?;
    json.push('\n');

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| CorpusError::io(&tmp_path, e))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| CorpusError::io(path, e))?;
    debug!(path = %path.display(), entries = manifest.len(), "saved manifest");
    Ok(())
}

/// Returns the opinion ids of every `<id>.pdf` file in `dir`.
///
/// A missing directory yields an empty set. Only canonical names count:
/// `notes.pdf` and `007.pdf` are both ignored.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] if the directory exists but cannot be listed.
pub async fn list_existing_artifact_ids(dir: &Path) -> Result<HashSet<u64>, CorpusError> {
    let mut ids = HashSet::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
        Err(error) => return Err(CorpusError::io(dir, error)),
    };

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CorpusError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension() != Some(OsStr::new(ARTIFACT_EXTENSION)) {
            continue;
        }
        let is_file = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        if let Some(id) = path
            .file_stem()
            .and_then(OsStr::to_str)
            .and_then(|stem| stem.parse::<u64>().ok())
            .filter(|&id| artifact_file_name(id) == name)
        {
            ids.insert(id);
        }
    }
    Ok(ids)
}

/// Deletes leftover `*.part` files from an interrupted run.
///
/// Returns the number of files removed. Failures to delete a single file are
/// logged and skipped.
///
/// # Errors
///
/// Returns [`CorpusError::Io`] if the directory exists but cannot be listed.
pub async fn remove_partial_files(dir: &Path) -> Result<usize, CorpusError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(error) => return Err(CorpusError::io(dir, error)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CorpusError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension() != Some(OsStr::new(PARTIAL_EXTENSION)) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to remove partial file");
            }
        }
    }
    if removed > 0 {
        info!(removed, dir = %dir.display(), "removed partial files from previous run");
    }
    Ok(removed)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
