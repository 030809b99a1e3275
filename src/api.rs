// src/api.rs
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::pipeline::{Pipeline, RunError, RunSummary};
use crate::proposal::StoredProposal;
use crate::store::{clamp_paging, Page, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

/// Public router. `/metrics` is mounted only when a recorder was installed.
pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/proposals", get(list_proposals))
        .route("/api/proposals/search", get(search_proposals))
        .route("/api/proposals/agency/{agency}", get(proposals_by_agency))
        .route("/api/sources", get(list_sources))
        .route("/api/scrape", post(trigger_scrape))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => api.merge(m.router()),
        None => api,
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Busy,
    Upstream(String),
    Unavailable(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::AlreadyRunning => ApiError::Busy,
            RunError::FetchAuth(_) => ApiError::Upstream(e.to_string()),
            RunError::Store(_) => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.to_string()),
            ApiError::Busy => (
                StatusCode::CONFLICT,
                "a scrape run is already in progress".to_string(),
            ),
            ApiError::Upstream(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
        };
        if status.is_server_error() {
            tracing::warn!(target: "api", status = status.as_u16(), error = %msg, "request failed");
        }
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

/// Paging params are read leniently: anything unparsable falls back to the default.
#[derive(Deserialize)]
struct PageQuery {
    page: Option<String>,
    limit: Option<String>,
}

async fn list_proposals(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<Page>, ApiError> {
    let (page, limit) = clamp_paging(
        q.page.and_then(|p| p.trim().parse().ok()),
        q.limit.and_then(|l| l.trim().parse().ok()),
    );
    let out = state.pipeline.store().list(page, limit).await?;
    Ok(Json(out))
}

#[derive(Serialize)]
struct ProposalList {
    proposals: Vec<StoredProposal>,
    total: usize,
}

impl From<Vec<StoredProposal>> for ProposalList {
    fn from(proposals: Vec<StoredProposal>) -> Self {
        Self {
            total: proposals.len(),
            proposals,
        }
    }
}

async fn proposals_by_agency(
    State(state): State<AppState>,
    Path(agency): Path<String>,
) -> Result<Json<ProposalList>, ApiError> {
    let agency = agency.trim();
    if agency.is_empty() {
        return Err(ApiError::BadRequest("agency must not be empty"));
    }
    let rows = state.pipeline.store().by_agency(agency).await?;
    Ok(Json(rows.into()))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_proposals(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ProposalList>, ApiError> {
    let needle = q.q.unwrap_or_default();
    let needle = needle.trim();
    if needle.is_empty() {
        return Err(ApiError::BadRequest("query parameter `q` is required"));
    }
    let rows = state.pipeline.store().search(needle).await?;
    Ok(Json(rows.into()))
}

#[derive(Serialize)]
struct SourceOut {
    url: String,
    agency: String,
    aggregator: bool,
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceOut>> {
    let out = state
        .pipeline
        .sources()
        .iter()
        .map(|s| SourceOut {
            url: s.url.clone(),
            agency: s.agency_label(),
            aggregator: s.aggregator,
        })
        .collect();
    Json(out)
}

async fn trigger_scrape(State(state): State<AppState>) -> Result<Json<RunSummary>, ApiError> {
    tracing::info!(target: "api", "manual scrape requested");
    let summary = state.pipeline.try_run().await?;
    Ok(Json(summary))
}
