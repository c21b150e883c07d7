//! Typed records for the search API's JSON responses.

use serde::Deserialize;

use crate::corpus::ArtifactDescriptor;
use crate::fetch::FetchError;

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    /// Result items in service order.
    pub results: Vec<SearchResultItem>,
    /// Opaque URL of the next page.
    #[serde(default)]
    pub next: Option<String>,
}

/// One search hit: an opinion cluster with its nested opinions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResultItem {
    #[serde(default)]
    pub cluster_id: Option<u64>,
    #[serde(default, rename = "caseName")]
    pub case_name: Option<String>,
    #[serde(default)]
    pub court: Option<String>,
    #[serde(default)]
    pub court_id: Option<String>,
    #[serde(default, rename = "dateFiled")]
    pub date_filed: Option<String>,
    #[serde(default, rename = "docketNumber")]
    pub docket_number: Option<String>,
    #[serde(default)]
    pub citation: Option<Vec<String>>,
    #[serde(default)]
    pub opinions: Option<Vec<SearchOpinion>>,
}

/// An opinion nested in a search hit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchOpinion {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, rename = "type")]
    pub opinion_type: Option<String>,
}

impl SearchOpinion {
    /// Storage path of the opinion when it points at a PDF.
    fn pdf_path(&self) -> Option<&str> {
        self.local_path
            .as_deref()
            .filter(|path| !path.is_empty() && path.ends_with(".pdf"))
    }
}

impl SearchPage {
    /// Cursor for the following page; `None` when this page is the last.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next.as_deref().filter(|next| !next.is_empty())
    }

    /// Flattens the page into artifact descriptors, keeping only PDF opinions.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MalformedResponse`] when a PDF opinion has no id.
    pub fn artifacts(&self, page_url: &str) -> Result<Vec<ArtifactDescriptor>, FetchError> {
        let mut artifacts = Vec::new();
        for item in &self.results {
            for opinion in item.opinions.iter().flatten() {
                let Some(local_path) = opinion.pdf_path() else {
                    continue;
                };
                let Some(opinion_id) = opinion.id else {
                    return Err(FetchError::malformed(
                        page_url,
                        format!("opinion with local_path {local_path} has no id"),
                    ));
                };
                artifacts.push(ArtifactDescriptor {
                    cluster_id: item.cluster_id,
                    case_name: item.case_name.clone(),
                    court: item.court.clone(),
                    court_id: item.court_id.clone(),
                    date_filed: item.date_filed.clone(),
                    docket_number: item.docket_number.clone(),
                    citations: item.citation.clone().unwrap_or_default(),
                    opinion_id,
                    local_path: local_path.to_string(),
                    download_url: opinion.download_url.clone(),
                    opinion_type: opinion.opinion_type.clone(),
                });
            }
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://example.com/api/rest/v4/search/";

    fn page(json: &str) -> SearchPage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_artifacts_copy_cluster_fields_into_each_opinion() {
        let page = page(
            r#"{
                "results": [{
                    "cluster_id": 555,
                    "caseName": "Acme Corp. v. Widget Co.",
                    "court": "Court of Appeals for the Federal Circuit",
                    "court_id": "cafc",
                    "dateFiled": "2024-01-15",
                    "docketNumber": "23-1234",
                    "citation": ["100 F.4th 1"],
                    "opinions": [
                        {"id": 1, "local_path": "pdf/2024/01/15/acme.pdf", "download_url": "https://cafc.uscourts.gov/acme.pdf", "type": "010combined"},
                        {"id": 2, "local_path": "pdf/2024/01/15/acme_dissent.pdf", "type": "040dissent"}
                    ]
                }],
                "next": null
            }"#,
        );

        let artifacts = page.artifacts(PAGE_URL).unwrap();
        assert_eq!(artifacts.len(), 2);
        let first = &artifacts[0];
        assert_eq!(first.opinion_id, 1);
        assert_eq!(first.cluster_id, Some(555));
        assert_eq!(first.case_name.as_deref(), Some("Acme Corp. v. Widget Co."));
        assert_eq!(first.court_id.as_deref(), Some("cafc"));
        assert_eq!(first.date_filed.as_deref(), Some("2024-01-15"));
        assert_eq!(first.docket_number.as_deref(), Some("23-1234"));
        assert_eq!(first.citations, vec!["100 F.4th 1".to_string()]);
        assert_eq!(first.opinion_type.as_deref(), Some("010combined"));
        assert_eq!(artifacts[1].opinion_id, 2);
        assert!(artifacts[1].download_url.is_none());
    }

    #[test]
    fn test_artifacts_drop_non_pdf_and_empty_paths() {
        let page = page(
            r#"{"results": [
                {"opinions": [{"id": 1, "local_path": "html/2024/a.html"}]},
                {"opinions": [{"id": 2, "local_path": ""}]},
                {"opinions": [{"id": 3, "local_path": null}]},
                {"opinions": [{"id": 4}]},
                {"opinions": null},
                {},
                {"opinions": [{"id": 5, "local_path": "pdf/b.pdf"}]}
            ]}"#,
        );
        let ids: Vec<u64> = page
            .artifacts(PAGE_URL)
            .unwrap()
            .iter()
            .map(|a| a.opinion_id)
            .collect();
        assert_eq!(ids, vec![5]);
    }

    #[test]
    fn test_pdf_opinion_without_id_is_malformed() {
        let page = page(r#"{"results": [{"opinions": [{"local_path": "pdf/x.pdf"}]}]}"#);
        let error = page.artifacts(PAGE_URL).unwrap_err();
        assert!(matches!(error, FetchError::MalformedResponse { .. }));
    }

    #[test]
    fn test_non_pdf_opinion_without_id_is_ignored() {
        let page = page(r#"{"results": [{"opinions": [{"local_path": "html/x.html"}]}]}"#);
        assert!(page.artifacts(PAGE_URL).unwrap().is_empty());
    }

    #[test]
    fn test_missing_results_field_fails_to_decode() {
        assert!(serde_json::from_str::<SearchPage>(r#"{"next": null}"#).is_err());
    }

    #[test]
    fn test_next_cursor_treats_empty_as_terminal() {
        assert!(page(r#"{"results": [], "next": ""}"#).next_cursor().is_none());
        assert!(page(r#"{"results": []}"#).next_cursor().is_none());
        assert_eq!(
            page(r#"{"results": [], "next": "https://example.com/?cursor=abc"}"#).next_cursor(),
            Some("https://example.com/?cursor=abc")
        );
    }
}
