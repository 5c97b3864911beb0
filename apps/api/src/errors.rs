use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::matching::comparator::CompareError;
use crate::matching::engine::MatchError;
use crate::registry::feedback::FeedbackError;
use crate::registry::model_registry::RegistryError;
use crate::skills::admin::SnapshotError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(what) => AppError::Conflict(format!("{what} already exists")),
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<MatchError> for AppError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::Validation(msg) => AppError::Validation(msg),
        }
    }
}

impl From<CompareError> for AppError {
    fn from(err: CompareError) -> Self {
        match err {
            CompareError::Validation(msg) => AppError::Validation(msg),
            CompareError::Store(e) => e.into(),
        }
    }
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Store(e) => e.into(),
            SnapshotError::DuplicateEntry(_) | SnapshotError::ConflictingMapping { .. } => {
                AppError::Conflict(err.to_string())
            }
            SnapshotError::EmptyList(_) | SnapshotError::BlankName(_) => {
                AppError::Validation(err.to_string())
            }
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => AppError::NotFound(format!("Model version {id}")),
            RegistryError::Invalid(msg) => AppError::Validation(msg),
            RegistryError::Duplicate { .. } | RegistryError::ExperimentActivation(_) => {
                AppError::Conflict(err.to_string())
            }
            RegistryError::Store(e) => e.into(),
        }
    }
}

impl From<FeedbackError> for AppError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::Invalid(msg) => AppError::Validation(msg),
            FeedbackError::Store(e) => e.into(),
            FeedbackError::Registry(e) => e.into(),
        }
    }
}
