//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::{ERROR_PUBLISH_FAILED, ERROR_SAVE_FAILED};
use crate::infra::PublishError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Client errors
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Validation(String),

    // Message intake failures, reported with fixed texts
    #[error("Failed to save message: {0}")]
    Persist(sea_orm::DbErr),

    #[error("Failed to send message to Kafka: {0}")]
    Publish(#[from] PublishError),

    // External service errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl AppError {
    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Persist(_)
            | AppError::Publish(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            // Show full message for client errors
            AppError::BadRequest(msg) | AppError::Validation(msg) => msg.clone(),

            // Hide details for server-side failures
            AppError::Persist(e) => {
                tracing::error!(error = %e, "Message insert failed");
                ERROR_SAVE_FAILED.to_string()
            }
            AppError::Publish(e) => {
                tracing::error!(error = %e, transient = e.is_transient(), "Message publish failed");
                ERROR_PUBLISH_FAILED.to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        }
    }

    /// Reclassify a database failure that happened while storing a message.
    pub fn into_persist(self) -> Self {
        match self {
            AppError::Database(e) => AppError::Persist(e),
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::bad_request("missing field").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Persist(DbErr::Custom("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(PublishError::Unavailable("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_intake_failures_use_fixed_texts() {
        let persist = AppError::Persist(DbErr::Custom("connection refused".into()));
        assert_eq!(persist.user_message(), "Failed to save message");

        let publish = AppError::from(PublishError::Timeout(std::time::Duration::from_secs(1)));
        assert_eq!(publish.user_message(), "Failed to send message to Kafka");
    }

    #[test]
    fn test_client_errors_echo_their_text() {
        let err = AppError::bad_request("missing field `message`");
        assert_eq!(err.user_message(), "missing field `message`");
    }

    #[test]
    fn test_into_persist_only_touches_database_errors() {
        let db = AppError::Database(DbErr::Custom("boom".into())).into_persist();
        assert!(matches!(db, AppError::Persist(_)));

        let other = AppError::validation("too long").into_persist();
        assert!(matches!(other, AppError::Validation(_)));
    }
}
