//! Integration tests for cursor-paginated search.

use std::time::Duration;

use opinion_corpus::fetch::{BackoffRequester, FetchError, HttpTimeouts, RetryPolicy};
use opinion_corpus::search::{SearchClient, SearchRequest, StopReason};
use opinion_corpus::NoProgress;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32) -> SearchClient {
    let policy = RetryPolicy::new(
        max_retries,
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
    );
    let requester = BackoffRequester::new(policy, HttpTimeouts::default()).expect("client");
    SearchClient::with_base_url(requester, format!("{}/search/", server.uri()))
}

fn cursor_url(server: &MockServer, cursor: &str) -> String {
    format!("{}/search/?cursor={cursor}", server.uri())
}

fn hit(opinion_id: u64, local_path: &str) -> Value {
    json!({
        "cluster_id": opinion_id * 10,
        "caseName": format!("Case {opinion_id}"),
        "court": "Court of Appeals for the Federal Circuit",
        "court_id": "cafc",
        "dateFiled": "2024-01-15",
        "docketNumber": format!("23-{opinion_id}"),
        "citation": [],
        "opinions": [{
            "id": opinion_id,
            "local_path": local_path,
            "download_url": null,
            "type": "010combined"
        }]
    })
}

fn pdf_hit(opinion_id: u64) -> Value {
    hit(opinion_id, &format!("pdf/2024/01/15/case_{opinion_id}.pdf"))
}

async fn mount_first_page(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "patent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_cursor_page(server: &MockServer, cursor: &str, response: ResponseTemplate, hits: u64) {
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("cursor", cursor))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

fn ids(artifacts: &[opinion_corpus::ArtifactDescriptor]) -> Vec<u64> {
    artifacts.iter().map(|a| a.opinion_id).collect()
}

// ==================== Pagination Tests ====================

#[tokio::test]
async fn test_search_follows_cursor_through_three_pages_in_order() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [pdf_hit(1), pdf_hit(2)], "next": cursor_url(&server, "p2")}),
    )
    .await;
    mount_cursor_page(
        &server,
        "p2",
        ResponseTemplate::new(200)
            .set_body_json(json!({"results": [pdf_hit(3)], "next": cursor_url(&server, "p3")})),
        1,
    )
    .await;
    mount_cursor_page(
        &server,
        "p3",
        ResponseTemplate::new(200).set_body_json(json!({"results": [pdf_hit(4)], "next": null})),
        1,
    )
    .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 100), &NoProgress)
        .await;

    assert_eq!(ids(&outcome.artifacts), vec![1, 2, 3, 4]);
    assert_eq!(outcome.pages_fetched, 3);
    assert!(matches!(outcome.stop, StopReason::CursorExhausted));
    assert!(!outcome.is_truncated());
}

#[tokio::test]
async fn test_search_stops_at_max_results_without_fetching_more_pages() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [pdf_hit(1)], "next": cursor_url(&server, "p2")}),
    )
    .await;
    mount_cursor_page(
        &server,
        "p2",
        ResponseTemplate::new(200).set_body_json(
            json!({"results": [pdf_hit(2), pdf_hit(3)], "next": cursor_url(&server, "p3")}),
        ),
        1,
    )
    .await;
    mount_cursor_page(
        &server,
        "p3",
        ResponseTemplate::new(200).set_body_json(json!({"results": [pdf_hit(4)]})),
        0,
    )
    .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 2), &NoProgress)
        .await;

    assert_eq!(ids(&outcome.artifacts), vec![1, 2]);
    assert_eq!(outcome.pages_fetched, 2);
    assert!(matches!(outcome.stop, StopReason::LimitReached));
}

#[tokio::test]
async fn test_search_drops_non_pdf_opinions_from_the_count() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [
            hit(1, "html/2024/01/15/case_1.html"),
            hit(2, ""),
            pdf_hit(3),
            pdf_hit(4)
        ]}),
    )
    .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 1), &NoProgress)
        .await;

    assert_eq!(ids(&outcome.artifacts), vec![3]);
}

#[tokio::test]
async fn test_search_empty_page_stops_even_with_cursor() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [], "next": cursor_url(&server, "p2")}),
    )
    .await;
    mount_cursor_page(
        &server,
        "p2",
        ResponseTemplate::new(200).set_body_json(json!({"results": [pdf_hit(1)]})),
        0,
    )
    .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 10), &NoProgress)
        .await;

    assert!(outcome.artifacts.is_empty());
    assert!(matches!(outcome.stop, StopReason::EmptyPage));
}

#[tokio::test]
async fn test_search_zero_max_results_issues_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 0), &NoProgress)
        .await;

    assert!(outcome.artifacts.is_empty());
    assert_eq!(outcome.pages_fetched, 0);
}

// ==================== Failure Tests ====================

#[tokio::test]
async fn test_search_failure_mid_pagination_returns_partial_results() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [pdf_hit(1), pdf_hit(2)], "next": cursor_url(&server, "p2")}),
    )
    .await;
    mount_cursor_page(&server, "p2", ResponseTemplate::new(500), 2).await;

    let outcome = client(&server, 1)
        .search(&SearchRequest::new("patent", 10), &NoProgress)
        .await;

    assert_eq!(ids(&outcome.artifacts), vec![1, 2]);
    assert!(outcome.is_truncated());
    assert_eq!(outcome.shortfall(), 8);
    match &outcome.stop {
        StopReason::Failed(error) => assert!(error.is_exhausted(), "got: {error:?}"),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_search_malformed_page_is_reported() {
    let server = MockServer::start().await;
    mount_first_page(
        &server,
        json!({"results": [pdf_hit(1)], "next": cursor_url(&server, "p2")}),
    )
    .await;
    mount_cursor_page(
        &server,
        "p2",
        ResponseTemplate::new(200).set_body_json(json!({"count": 3, "next": null})),
        1,
    )
    .await;

    let outcome = client(&server, 0)
        .search(&SearchRequest::new("patent", 10), &NoProgress)
        .await;

    assert_eq!(ids(&outcome.artifacts), vec![1]);
    assert!(matches!(
        outcome.stop,
        StopReason::Failed(FetchError::MalformedResponse { .. })
    ));
}

#[tokio::test]
async fn test_search_first_page_forbidden_returns_empty_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client(&server, 5)
        .search(&SearchRequest::new("patent", 10), &NoProgress)
        .await;

    assert!(outcome.artifacts.is_empty());
    assert!(matches!(
        outcome.stop,
        StopReason::Failed(FetchError::HttpStatus { status: 403, .. })
    ));
}

// ==================== Request Parameter Tests ====================

#[tokio::test]
async fn test_search_sends_filters_on_first_request_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/"))
        .and(query_param("q", "obviousness"))
        .and(query_param("type", "o"))
        .and(query_param("order_by", "dateFiled desc"))
        .and(query_param("page_size", "20"))
        .and(query_param("court", "cafc"))
        .and(query_param("filed_after", "2020-01-01"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": [pdf_hit(1)], "next": cursor_url(&server, "p2")})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_cursor_page(
        &server,
        "p2",
        ResponseTemplate::new(200).set_body_json(json!({"results": [pdf_hit(2)], "next": ""})),
        1,
    )
    .await;

    let request = SearchRequest::new("obviousness", 10)
        .with_court(Some("cafc".to_string()))
        .with_filed_after(Some("2020-01-01".to_string()));
    let outcome = client(&server, 0).search(&request, &NoProgress).await;

    assert_eq!(ids(&outcome.artifacts), vec![1, 2]);

    let requests = server.received_requests().await.expect("recording enabled");
    let second = requests[1].url.query().unwrap_or_default().to_string();
    assert_eq!(second, "cursor=p2", "cursor URL must be used verbatim");
}
