//! HTTP Error Mapping
//!
//! Every typed core error surfaces to the caller with a stable machine
//! kind and a human-presentable message; guard failures are client errors,
//! never 500s.

use alert_engine::AlertError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use machine_allocator::AllocatorError;
use serde_json::json;
use session_lifecycle::LifecycleError;
use storage::StorageError;

/// API-level error with its HTTP mapping
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.kind,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", e.to_string())
            }
            StorageError::DatabaseError(_) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                e.to_string(),
            ),
        }
    }
}

impl From<AllocatorError> for ApiError {
    fn from(e: AllocatorError) -> Self {
        match e {
            AllocatorError::MachineUnavailable { .. } => {
                ApiError::new(StatusCode::CONFLICT, "machine_unavailable", e.to_string())
            }
            AllocatorError::Storage(inner) => inner.into(),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidStateTransition { .. } => ApiError::new(
                StatusCode::CONFLICT,
                "invalid_state_transition",
                e.to_string(),
            ),
            LifecycleError::ReasonRequired => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "reason_required", e.to_string())
            }
            LifecycleError::MachineRequired => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "machine_required",
                e.to_string(),
            ),
            LifecycleError::Validation(inner) => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                inner.to_string(),
            ),
            LifecycleError::Allocator(inner) => inner.into(),
            LifecycleError::Storage(inner) => inner.into(),
        }
    }
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        match e {
            AlertError::InvalidAlertTransition { .. } => ApiError::new(
                StatusCode::CONFLICT,
                "invalid_state_transition",
                e.to_string(),
            ),
            AlertError::Storage(inner) => inner.into(),
        }
    }
}
