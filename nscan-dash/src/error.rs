//! Error types for nscan-dash
//!
//! Every failure leaving an HTTP handler becomes a JSON body of the form
//! `{"error": {"code": ..., "message": ...}}`.

use crate::pipeline::AnalysisError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404), e.g. an unknown or ended session
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Malformed or oversized multipart upload
    #[error("Upload error: {0}")]
    Multipart(#[from] MultipartError),

    /// Analysis failure, mapped per variant
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Multipart(err) => (err.status(), "UPLOAD_ERROR"),
            ApiError::Analysis(AnalysisError::NotConnected) => {
                (StatusCode::SERVICE_UNAVAILABLE, "NOT_CONNECTED")
            }
            ApiError::Analysis(AnalysisError::Classification(_)) => {
                (StatusCode::BAD_GATEWAY, "CLASSIFICATION_FAILED")
            }
            ApiError::Analysis(AnalysisError::Storage(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
        };

        let message = match &self {
            ApiError::Analysis(AnalysisError::NotConnected) => {
                "AI model is not connected. Reconnect and try again.".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
