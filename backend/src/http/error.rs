//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Report pipeline error
    Report(ReportError),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Report(err) => {
                let msg = err.to_string();
                match err {
                    ReportError::InvalidQuery(_) => {
                        (StatusCode::BAD_REQUEST, ApiError::new("INVALID_QUERY", msg))
                    }
                    ReportError::Busy => (StatusCode::CONFLICT, ApiError::new("BUSY", msg)),
                    ReportError::Duplicate { key } => (
                        StatusCode::CONFLICT,
                        ApiError::new("DUPLICATE", msg).with_details(key),
                    ),
                    ReportError::Configuration(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("CONFIGURATION_ERROR", msg),
                    ),
                    ReportError::Pipeline(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("PIPELINE_ERROR", msg),
                    ),
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejections_are_conflicts() {
        let (status, body) = AppError::from(ReportError::Busy).status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.code, "BUSY");

        let (status, body) =
            AppError::from(ReportError::Duplicate { key: "c1|a|b".into() }).status_and_body();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.details.as_deref(), Some("c1|a|b"));
    }

    #[test]
    fn test_invalid_query_is_bad_request() {
        let (status, body) =
            AppError::from(ReportError::invalid_query("no devices selected")).status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_QUERY");
        assert!(body.message.contains("no devices selected"));
    }

    #[test]
    fn test_pipeline_failure_is_internal() {
        let (status, _) = AppError::from(ReportError::pipeline("boom")).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
