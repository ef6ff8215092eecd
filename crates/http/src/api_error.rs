//! Typed API error for HTTP handlers.
//!
//! Converts service errors into HTTP responses with a JSON body and status
//! code. Handlers return `Result<Json<T>, ApiError>`.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use portal_sessions_service::ServiceError;

/// API error with HTTP status code and human-readable message.
///
/// Converts to JSON response: `{"error": "message"}`.
///
/// `Internal` and `ServiceUnavailable` log the real error server-side and
/// return a static message to the client.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request: invalid payload, type, source or filter.
    BadRequest(String),
    /// 404 Not Found: no session with this `(source, type, id)`.
    NotFound(String),
    /// 409 Conflict: strict create hit an existing session.
    Conflict(String),
    /// 500 Internal Server Error: unexpected failure. Details logged, not exposed.
    Internal(String),
    /// 503 Service Unavailable: backing store unreachable.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            },
            Self::ServiceUnavailable(err) => {
                tracing::error!(error = %err, "session store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "session store unavailable".to_owned())
            },
        };
        let body = serde_json::json!({"error": message});
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::SessionInvalid(_) | ServiceError::SessionQueryInvalid(_) => {
                Self::BadRequest(err.to_string())
            },
            ServiceError::SessionNotFound { .. } => Self::NotFound(err.to_string()),
            ServiceError::SessionAlreadyExists(_) => Self::Conflict(err.to_string()),
            ServiceError::StoreUnavailable(_) => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

/// Malformed query strings get the same JSON error shape as every other 400.
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
