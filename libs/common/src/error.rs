//! Custom error types for the common library
//!
//! This module defines the error types shared by the Noter services: the
//! database and repository errors raised by persistence code, and the HTTP
//! facing [`ApiError`] that every handler returns.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A stored value could not be mapped back onto a model
    #[error("Database decode error: {0}")]
    Decode(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised by the repository layer
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// A uniqueness constraint was violated
    #[error("{0}")]
    Conflict(String),

    /// The storage backend failed
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Type alias for Result with RepositoryError
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Error type returned by every HTTP handler
#[derive(Error, Debug)]
pub enum ApiError {
    /// A request field failed validation
    #[error("{0}")]
    Validation(String),

    /// The request could not be parsed
    #[error("{0}")]
    BadRequest(String),

    /// The addressed resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// The resource already exists
    #[error("{0}")]
    Conflict(String),

    /// Credentials or token missing
    #[error("Unauthorized")]
    Unauthorized,

    /// Email address and password do not match
    #[error("Email address or password is incorrect.")]
    InvalidCredentials,

    /// Token invalid or expired, or the resource belongs to someone else
    #[error("Forbidden")]
    Forbidden,

    /// Login attempts exhausted for now
    #[error("Too many login attempts. Please try again later.")]
    TooManyRequests,

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Repository error
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Attachment storage error
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::Repository(RepositoryError::Conflict(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalServerError
            | ApiError::Repository(RepositoryError::Database(_))
            | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            if !matches!(self, ApiError::InternalServerError) {
                error!("Request failed: {}", self);
            }
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
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

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("Invalid name".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Repository(RepositoryError::Conflict("taken".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Repository(RepositoryError::Database(DatabaseError::Decode("x".into())))
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_internal_errors_hide_their_cause() {
        let response = ApiError::Repository(RepositoryError::Database(
            DatabaseError::Configuration("secret detail".into()),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");
    }
}
