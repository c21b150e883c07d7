//! On-disk corpus layout and manifest persistence.
//!
//! A corpus lives at `<data_dir>/<corpus>/` and holds:
//!
//! ```text
//! <data_dir>/<corpus>/
//! ├── metadata.json        manifest of every downloaded opinion
//! └── opinions/
//!     ├── <opinion_id>.pdf
//!     └── <opinion_id>.pdf.part   (only while a download is in flight)
//! ```

mod error;
mod manifest;
mod store;

use std::path::{Path, PathBuf};

pub use error::CorpusError;
pub use manifest::{ArtifactDescriptor, Manifest, ManifestHeader, artifact_file_name};
pub use store::{list_existing_artifact_ids, load_manifest, remove_partial_files, save_manifest};

/// Name of the manifest file inside the corpus root.
pub const MANIFEST_FILE_NAME: &str = "metadata.json";

/// Name of the artifact directory inside the corpus root.
pub const OPINIONS_DIR_NAME: &str = "opinions";

/// Paths making up one corpus directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    root: PathBuf,
}

impl CorpusLayout {
    /// Creates the layout for `corpus` under `data_dir`. Touches no files.
    pub fn new(data_dir: impl AsRef<Path>, corpus: &str) -> Self {
        Self {
            root: data_dir.as_ref().join(corpus),
        }
    }

    /// Corpus root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the PDFs.
    #[must_use]
    pub fn opinions_dir(&self) -> PathBuf {
        self.root.join(OPINIONS_DIR_NAME)
    }

    /// Path of `metadata.json`.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Final path of an opinion PDF.
    #[must_use]
    pub fn artifact_path(&self, opinion_id: u64) -> PathBuf {
        self.opinions_dir().join(artifact_file_name(opinion_id))
    }

    /// In-flight path of an opinion PDF.
    #[must_use]
    pub fn partial_path(&self, opinion_id: u64) -> PathBuf {
        self.opinions_dir()
            .join(format!("{}.part", artifact_file_name(opinion_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = CorpusLayout::new("/data", "patent_cases");
        assert_eq!(layout.root(), Path::new("/data/patent_cases"));
        assert_eq!(layout.opinions_dir(), Path::new("/data/patent_cases/opinions"));
        assert_eq!(
            layout.metadata_path(),
            Path::new("/data/patent_cases/metadata.json")
        );
        assert_eq!(
            layout.artifact_path(9_876_543),
            Path::new("/data/patent_cases/opinions/9876543.pdf")
        );
        assert_eq!(
            layout.partial_path(9_876_543),
            Path::new("/data/patent_cases/opinions/9876543.pdf.part")
        );
    }
}
