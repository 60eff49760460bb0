//! HTTP surface of the PageSense server
//!
//! - `POST /api/audit` - run an audit, respond with the PDF
//! - `GET /api/audits` - audit history for an email
//! - `GET /api/audits/:email/:id` - one stored report as embeddable HTML
//! - `GET /health`

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use audit_core::{responsive_view, AuditRequest, Identity};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::RecordSummary;

const DEFAULT_HISTORY_LIMIT: u32 = 50;
const MAX_HISTORY_LIMIT: u32 = 200;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "pagesense-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: POST /api/audit
pub async fn handle_audit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    let request = request.validate()?;

    info!(url = %request.url, identity = %request.identity, "Audit requested");

    let outcome = state.pipeline.run(request).await?;
    // Side effects keep running after the response is sent
    drop(outcome.side_effects);

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, "attachment; filename=audit.pdf"),
        ],
        outcome.pdf,
    )
        .into_response())
}

/// Fallback for any other method on `/api/audit`
pub async fn handle_method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub email: String,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// History list response
#[derive(Serialize)]
pub struct HistoryResponse {
    pub email: String,
    pub audits: Vec<RecordSummary>,
    pub count: usize,
}

/// Handler: GET /api/audits?email=&limit=
pub async fn handle_list_audits(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::MalformedBody(e.body_text()))?;
    let store = state.store.as_ref().ok_or(ApiError::NotFound)?;
    let identity = Identity::from_email(&query.email);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let audits: Vec<RecordSummary> = store
        .list(&identity, limit)
        .await?
        .iter()
        .map(|record| record.summary())
        .collect();

    debug!(identity = %identity, count = audits.len(), "Listed audit history");

    Ok(Json(HistoryResponse {
        email: identity.to_string(),
        count: audits.len(),
        audits,
    }))
}

/// Handler: GET /api/audits/:email/:id
pub async fn handle_get_report(
    State(state): State<Arc<AppState>>,
    Path((email, id)): Path<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let store = state.store.as_ref().ok_or(ApiError::NotFound)?;
    let identity = Identity::from_email(&email);

    let html = store
        .get(&identity, &id)
        .await?
        .and_then(|record| record.html)
        .ok_or(ApiError::NotFound)?;

    Ok(Html(responsive_view(&html)))
}

/// Routes with CORS and request tracing. Per-IP throttling is layered on by
/// the binary, which also supplies peer addresses.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route(
            "/api/audit",
            post(handle_audit).fallback(handle_method_not_allowed),
        )
        .route("/api/audits", get(handle_list_audits))
        .route("/api/audits/:email/:id", get(handle_get_report))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
