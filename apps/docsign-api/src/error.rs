//! Error types for DocSign API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docsign_core::{LifecycleError, PlacementError, ProviderError};
use serde_json::json;
use thiserror::Error;

/// What users see for any provider failure. The upstream body only goes to
/// the log.
pub const PROVIDER_FAILURE_MESSAGE: &str =
    "The signing service could not complete the request, please try again later";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Document not found: {0}")]
    DocumentNotFound(i64),

    #[error("Document {0} has not been signed yet")]
    NotSigned(i64),

    #[error("Invalid placement: {0}")]
    Validation(String),

    #[error("Page metrics are not loaded yet")]
    NotReady,

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("{0}")]
    InvalidTransition(LifecycleError),

    #[error("Document {0} was modified concurrently")]
    Conflict(i64),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PlacementError> for ApiError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::NotReady => ApiError::NotReady,
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotSigned(id) => ApiError::NotSigned(id),
            LifecycleError::InvalidTransition { .. } => ApiError::InvalidTransition(err),
            LifecycleError::UnknownStatus(_) | LifecycleError::Corrupted { .. } => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DocumentNotFound(_) | ApiError::NotSigned(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::NotReady => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidTransition(_) | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Provider(ProviderError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Storage(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            ApiError::NotSigned(_) => "NOT_SIGNED",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotReady => "PAGE_NOT_READY",
            ApiError::InvalidUpload(_) => "INVALID_UPLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::InvalidTransition(_) => "INVALID_TRANSITION",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Provider(e) => e.code(),
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Provider(e) => {
                tracing::error!("Provider error: {}", e);
                PROVIDER_FAILURE_MESSAGE.to_string()
            }
            ApiError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                "Storage error".to_string()
            }
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
