//! API error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lif_core::CoreError;
use lif_runtime::RuntimeError;
use serde::{Deserialize, Serialize};

/// JSON body of an error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error kind, e.g. `resource_not_found`
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Error returned by a handler
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The declaration did not compile
    #[error(transparent)]
    Compile(#[from] CoreError),

    /// The deploy failed
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ApiError {
    /// HTTP status and body for this error
    #[must_use]
    pub fn to_parts(&self) -> (StatusCode, ErrorBody) {
        let (status, error) = match self {
            Self::Compile(err) | Self::Runtime(RuntimeError::Compile(err)) => {
                (StatusCode::BAD_REQUEST, err.kind().to_string())
            }
            Self::Runtime(RuntimeError::StartupFailed { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "startup_failed".to_string())
            }
            Self::Runtime(_) => (StatusCode::INTERNAL_SERVER_ERROR, "runtime".to_string()),
        };
        (
            status,
            ErrorBody {
                error,
                message: self.to_string(),
            },
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_parts();
        tracing::warn!(status = %status, error = %body.error, "request failed");
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_is_bad_request() {
        let err = ApiError::from(CoreError::ResourceNotFound {
            id: "ghost".to_string(),
        });
        let (status, body) = err.to_parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "resource_not_found");
        assert!(body.message.contains("ghost"));
    }

    #[test]
    fn test_startup_failure_is_server_error() {
        let err = ApiError::from(RuntimeError::StartupFailed {
            reason: "boom".to_string(),
        });
        let (status, body) = err.to_parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "startup_failed");
    }
}
