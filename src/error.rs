use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Rejected edits to a draft stop list. The list is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StopError {
    #[error("order {0} is already on the route")]
    DuplicateStop(String),

    #[error("stop index {index} out of range for {len} stops")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("priority {0} must be between 1 and 5")]
    InvalidPriority(u8),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("write rejected: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("route failed validation: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("route {0} is already published")]
    AlreadyPublished(uuid::Uuid),

    #[error("failed to save route: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::WriteFailed(msg) => AppError::Internal(msg),
        }
    }
}

impl From<StopError> for AppError {
    fn from(err: StopError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Validation(reasons) => AppError::Validation(reasons),
            PublishError::AlreadyPublished(id) => {
                AppError::Conflict(format!("route {id} is already published"))
            }
            PublishError::Store(err) => err.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Validation(reasons) => {
                let body = Json(json!({
                    "error": "route failed validation",
                    "reasons": reasons,
                }));
                return (StatusCode::UNPROCESSABLE_ENTITY, body).into_response();
            }
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
