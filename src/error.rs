//! Error types of the service layer and their HTTP mapping.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, policy::PolicyError};

/// Failures of the completion, settings and session services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The installed remote store rejected or failed the call.
    #[error("remote store unavailable")]
    Unavailable(#[source] StorageError),
    /// No remote store is installed right now.
    #[error("remote store unavailable (degraded mode)")]
    Degraded,
    /// No session credential, or the wrong one.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Malformed username, settings or game result.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The requested game or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A spawned remote write ended without reporting back.
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<PolicyError> for ServiceError {
    fn from(err: PolicyError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
}

/// Errors returned by HTTP handlers, rendered as `{ "message": .. }`.
#[derive(Debug, Error)]
pub enum AppError {
    /// 400
    #[error("bad request: {0}")]
    BadRequest(String),
    /// 401
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// 404
    #[error("not found: {0}")]
    NotFound(String),
    /// 503, the remote store cannot be reached.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// 500
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Task(message) => AppError::Internal(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::from(err).into()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (ServiceError::Degraded, StatusCode::SERVICE_UNAVAILABLE),
            (
                ServiceError::Unauthorized("no session".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::InvalidInput("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::NotFound("game".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Task("panicked".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn policy_errors_are_bad_requests() {
        let err = AppError::from(ServiceError::from(PolicyError::NoQuestions));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
