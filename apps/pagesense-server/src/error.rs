//! Error types for the PageSense server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analyzer::AnalysisError;
use crate::pdf::RenderError;
use crate::rate_limit::RateLimitError;
use crate::store::StoreError;
use audit_core::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Render failed: {0}")]
    Render(#[from] RenderError),

    #[error("Audit store unavailable: {0}")]
    Unavailable(#[from] RateLimitError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::MalformedBody(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded".to_string()),
            ApiError::Analysis(e) => {
                tracing::error!("Analysis error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OpenAI model failed or returned invalid JSON".to_string(),
                )
            }
            ApiError::Render(e) => {
                tracing::error!("Render error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Unavailable(e) => {
                tracing::error!("Rate limiter unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable".to_string(),
                )
            }
            ApiError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method not allowed".to_string(),
            ),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
