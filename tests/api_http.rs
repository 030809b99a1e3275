// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use grant_scout::api::{self, AppState};
use grant_scout::config::Source;
use grant_scout::ingest::providers::FixtureFetcher;
use grant_scout::ingest::types::FetchError;
use grant_scout::ingest::BatchConfig;
use grant_scout::store::MemoryStore;
use grant_scout::Pipeline;

const BODY_LIMIT: usize = 1024 * 1024;

const SERB: &str = "https://serb.gov.in/page/show/63";
const ISTI: &str = "https://www.indiascienceandtechnology.gov.in/funding-opportunities";

fn pipeline_with(fetcher: FixtureFetcher) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(
        Arc::new(fetcher),
        Arc::new(MemoryStore::new()),
        vec![Source::new(SERB), Source::new(ISTI)],
        BatchConfig::immediate(),
    ))
}

fn fixtures() -> FixtureFetcher {
    FixtureFetcher::new()
        .with_markdown(SERB, include_str!("fixtures/serb_page.md"))
        .with_markdown(ISTI, include_str!("fixtures/aggregator_page.md"))
}

fn app(p: &Arc<Pipeline>) -> Router {
    api::router(AppState::new(p.clone()), None)
}

async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

async fn call_json(app: Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let (status, bytes) = call(app, method, uri).await;
    let v = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let p = pipeline_with(fixtures());
    let (status, body) = call(app(&p), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "OK");
}

#[tokio::test]
async fn scrape_then_query() {
    let p = pipeline_with(fixtures());

    let (status, summary) = call_json(app(&p), "POST", "/api/scrape").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["found"], 5);
    assert_eq!(summary["inserted"], 5);
    assert!(summary.get("newRecords").is_none());

    let (status, page) = call_json(app(&p), "GET", "/api/proposals?page=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 5);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["limit"], 2);
    let first = &page["proposals"][0];
    assert_eq!(first["endDate"], "2025-05-05");
    assert!(first["id"].as_i64().unwrap() > 0);
    assert!(first.get("createdAt").is_some());
    assert!(first.get("extractedAt").is_some());

    let (_, by_agency) = call_json(app(&p), "GET", "/api/proposals/agency/serb").await;
    assert_eq!(by_agency["total"], 1);
    assert_eq!(by_agency["proposals"][0]["link"], "https://serb.gov.in/crg/apply");

    let (_, hits) = call_json(app(&p), "GET", "/api/proposals/search?q=genome").await;
    assert_eq!(hits["total"], 1);
    assert_eq!(hits["proposals"][0]["agency"], "DBT");
}

#[tokio::test]
async fn paging_input_is_clamped() {
    let p = pipeline_with(fixtures());
    let (_, page) = call_json(app(&p), "GET", "/api/proposals?page=0&limit=1000").await;
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 100);

    let (status, page) = call_json(app(&p), "GET", "/api/proposals?page=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 20);
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn search_requires_query() {
    let p = pipeline_with(fixtures());
    let (status, body) = call_json(app(&p), "GET", "/api/proposals/search?q=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains('q'));
    let (status, _) = call(app(&p), "GET", "/api/proposals/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sources_lists_resolved_agencies() {
    let p = pipeline_with(fixtures());
    let (status, v) = call_json(app(&p), "GET", "/api/sources").await;
    assert_eq!(status, StatusCode::OK);
    let arr = v.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["agency"], "SERB");
    assert_eq!(arr[0]["aggregator"], false);
    assert_eq!(arr[1]["aggregator"], true);
}

#[tokio::test]
async fn bad_credentials_map_to_bad_gateway() {
    let p = pipeline_with(FixtureFetcher::new().with_error(SERB, FetchError::Auth(401)));
    let (status, body) = call_json(app(&p), "POST", "/api/scrape").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("authenticate"));
}
