//! Error types for whereabouts-api
//!
//! Every handler returns `ApiResult<T>`; the `IntoResponse` impl below is the
//! single place where failures become HTTP statuses.

use axum::{
    body::Body,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use whereabouts_common::attendance::OutcomeError;

use crate::clients::UpstreamError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Attendance details rejected by the outcome mapper (400)
    #[error(transparent)]
    InvalidAttendance(#[from] OutcomeError),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Missing or malformed credentials (403)
    #[error("Access denied")]
    AccessDenied,

    /// Non-success response from an upstream service, passed through as-is
    #[error("Upstream service returned {status}")]
    Upstream {
        status: StatusCode,
        content_type: Option<String>,
        body: String,
    },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_message: Option<String>,
    pub developer_message: String,
}

impl From<whereabouts_common::Error> for ApiError {
    fn from(err: whereabouts_common::Error) -> Self {
        use whereabouts_common::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status {
                status,
                content_type,
                body,
            } => ApiError::Upstream {
                status,
                content_type,
                body,
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, user_message, developer_message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone()), msg),
            ApiError::InvalidAttendance(err) => {
                let msg = err.to_string();
                (StatusCode::BAD_REQUEST, Some(msg.clone()), msg)
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone()), msg),
            ApiError::AccessDenied => return StatusCode::FORBIDDEN.into_response(),
            ApiError::Upstream {
                status,
                content_type,
                body,
            } => {
                warn!(status = %status, "Passing through upstream error");
                let mut builder = Response::builder().status(status);
                if let Some(content_type) = content_type {
                    builder = builder.header(header::CONTENT_TYPE, content_type);
                }
                return builder
                    .body(Body::from(body))
                    .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response());
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, None, msg)
            }
            ApiError::Database(err) => {
                error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, None, err.to_string())
            }
        };

        let body = Json(ErrorResponse {
            status: status.as_u16(),
            user_message,
            developer_message,
        });

        (status, body).into_response()
    }
}
