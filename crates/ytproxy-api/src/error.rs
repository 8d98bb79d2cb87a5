//! API error types.
//!
//! Taxonomy: invalid request parameters are client errors (400), an
//! unreachable or failing backend tool is a 502 whose stderr detail goes to
//! the logs rather than the client, and anything after response headers
//! have been sent can only truncate the stream.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ytproxy_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("search/extraction backend failed")]
    BackendUnavailable {
        code: &'static str,
        #[source]
        source: MediaError,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::NotFound(_) => "no_results",
            ApiError::BackendUnavailable { code, .. } => code,
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            // Pre-spawn validation errors surface as client errors.
            MediaError::EmptyQuery => Self::bad_request("query must not be empty"),
            MediaError::NoResults => Self::NotFound("no results found".to_string()),
            other => Self::BackendUnavailable {
                code: other.reason_code(),
                source: other,
            },
        }
    }
}

/// JSON error envelope: `{"error": ..., "code": ...}`.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.reason_code().to_string();

        // Backend stderr belongs in the logs, not the response body.
        if let ApiError::BackendUnavailable { source, .. } = &self {
            tracing::error!(error = %source, code, "backend failure");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_400() {
        let err: ApiError = MediaError::EmptyQuery.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason_code(), "invalid_request");
    }

    #[test]
    fn backend_errors_map_to_502_without_stderr() {
        let err: ApiError = MediaError::StageFailed {
            tool: "yt-dlp",
            exit_code: Some(1),
            stderr: "ERROR: secret internals".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.reason_code(), "stage_failed");
        // Client-visible text never echoes the captured stderr.
        assert!(!err.to_string().contains("secret"));
    }
}
