//! Unified error handling for HTTP handlers.
//!
//! All route handlers return `Result<T, AppError>`. Server-side failures are
//! logged here and answered with a generic message; database details never
//! reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ServiceError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// A service call failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Service(ServiceError::Repository(err))
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Service(err) => match err {
                ServiceError::UniquenessConflict { .. } => StatusCode::CONFLICT,
                ServiceError::UnknownProduct(_) | ServiceError::InvalidOrder(_) => {
                    StatusCode::BAD_REQUEST
                }
                ServiceError::Repository(err) => match err {
                    RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
                    RepositoryError::WrongProductType { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    RepositoryError::Conflict(_) | RepositoryError::Integrity(_) => {
                        StatusCode::CONFLICT
                    }
                    RepositoryError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    RepositoryError::Database { .. } | RepositoryError::DataCorruption(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                },
            },
        }
    }

    /// Message safe to show to clients.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Service(err) => match err {
                ServiceError::Repository(err) => match err {
                    RepositoryError::NotFound { .. } => "not found".to_string(),
                    RepositoryError::WrongProductType { expected, .. } => {
                        format!("product is not a {expected}")
                    }
                    RepositoryError::Conflict(_) => "resource already exists".to_string(),
                    RepositoryError::Integrity(_) => {
                        "request conflicts with related data".to_string()
                    }
                    RepositoryError::Timeout { .. } => "request timed out".to_string(),
                    RepositoryError::Database { .. } | RepositoryError::DataCorruption(_) => {
                        "internal server error".to_string()
                    }
                },
                other => other.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request error");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = ErrorResponse {
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
