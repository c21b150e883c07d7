//! Artifact descriptors and the corpus manifest.
//!
//! The manifest keeps one entry per `opinion_id` in insertion order, so the
//! `metadata.json` it serializes to is stable across re-runs.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One downloadable opinion PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Opinion cluster the opinion belongs to.
    #[serde(default)]
    pub cluster_id: Option<u64>,
    /// Case name as reported by the search API.
    #[serde(default)]
    pub case_name: Option<String>,
    /// Court display name.
    #[serde(default)]
    pub court: Option<String>,
    /// Court identifier (e.g. `cafc`).
    #[serde(default)]
    pub court_id: Option<String>,
    /// Filing date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date_filed: Option<String>,
    /// Docket number.
    #[serde(default)]
    pub docket_number: Option<String>,
    /// Reporter citations. `null` in the file reads as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<String>,
    /// Unique opinion identifier; names the file on disk.
    pub opinion_id: u64,
    /// Path of the PDF relative to the storage host.
    pub local_path: String,
    /// Original court download URL, if known.
    #[serde(default)]
    pub download_url: Option<String>,
    /// Opinion type (lead, concurrence, dissent, ...).
    #[serde(default)]
    pub opinion_type: Option<String>,
}

impl ArtifactDescriptor {
    /// Creates a descriptor with only the identifying fields set.
    pub fn new(opinion_id: u64, local_path: impl Into<String>) -> Self {
        Self {
            cluster_id: None,
            case_name: None,
            court: None,
            court_id: None,
            date_filed: None,
            docket_number: None,
            citations: Vec::new(),
            opinion_id,
            local_path: local_path.into(),
            download_url: None,
            opinion_type: None,
        }
    }

    /// File name of the artifact inside the corpus `opinions` directory.
    #[must_use]
    pub fn file_name(&self) -> String {
        artifact_file_name(self.opinion_id)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// File name used for an opinion id.
#[must_use]
pub fn artifact_file_name(opinion_id: u64) -> String {
    format!("{opinion_id}.pdf")
}

/// Corpus-level fields written alongside the opinions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestHeader {
    /// Corpus name (directory name under the data dir).
    pub corpus: String,
    /// Search query that produced the corpus.
    pub search_query: String,
    /// Court filter used for the search, if any.
    pub court_filter: Option<String>,
}

impl ManifestHeader {
    /// Creates a header.
    pub fn new(
        corpus: impl Into<String>,
        search_query: impl Into<String>,
        court_filter: Option<String>,
    ) -> Self {
        Self {
            corpus: corpus.into(),
            search_query: search_query.into(),
            court_filter,
        }
    }
}

/// Serialized form of `metadata.json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ManifestFile {
    pub corpus: String,
    pub search_query: String,
    #[serde(default)]
    pub court_filter: Option<String>,
    #[serde(default)]
    pub total_opinions: usize,
    #[serde(default)]
    pub opinions: Vec<ArtifactDescriptor>,
}

/// Ordered mapping from `opinion_id` to descriptor plus the corpus header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    header: ManifestHeader,
    entries: Vec<ArtifactDescriptor>,
    index: HashMap<u64, usize>,
}

impl Manifest {
    /// Creates an empty manifest.
    #[must_use]
    pub fn new(header: ManifestHeader) -> Self {
        Self {
            header,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the header.
    #[must_use]
    pub fn header(&self) -> &ManifestHeader {
        &self.header
    }

    /// Replaces the header, keeping every entry.
    pub fn set_header(&mut self, header: ManifestHeader) {
        self.header = header;
    }

    /// Inserts or overwrites the entry for `descriptor.opinion_id`.
    ///
    /// An existing entry keeps its position. Returns true when the id was new.
    pub fn upsert(&mut self, descriptor: ArtifactDescriptor) -> bool {
        if let Some(&position) = self.index.get(&descriptor.opinion_id) {
            if let Some(slot) = self.entries.get_mut(position) {
                *slot = descriptor;
            }
            false
        } else {
            self.index.insert(descriptor.opinion_id, self.entries.len());
            self.entries.push(descriptor);
            true
        }
    }

    /// Inserts the descriptor only if its id is absent. Returns true if inserted.
    pub fn insert_if_absent(&mut self, descriptor: ArtifactDescriptor) -> bool {
        if self.contains(descriptor.opinion_id) {
            false
        } else {
            self.upsert(descriptor)
        }
    }

    /// Returns true when the manifest has an entry for `opinion_id`.
    #[must_use]
    pub fn contains(&self, opinion_id: u64) -> bool {
        self.index.contains_key(&opinion_id)
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, opinion_id: u64) -> Option<&ArtifactDescriptor> {
        self.index
            .get(&opinion_id)
            .and_then(|&position| self.entries.get(position))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the manifest has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ArtifactDescriptor> {
        self.entries.iter()
    }

    pub(crate) fn from_file(file: ManifestFile) -> Self {
        let mut manifest = Self::new(ManifestHeader {
            corpus: file.corpus,
            search_query: file.search_query,
            court_filter: file.court_filter,
        });
        for descriptor in file.opinions {
            manifest.upsert(descriptor);
        }
        manifest
    }

    pub(crate) fn to_file(&self) -> ManifestFile {
        ManifestFile {
            corpus: self.header.corpus.clone(),
            search_query: self.header.search_query.clone(),
            court_filter: self.header.court_filter.clone(),
            total_opinions: self.entries.len(),
            opinions: self.entries.clone(),
        }
    }
}
