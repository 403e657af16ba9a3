//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use record_editor::EditError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the daemon and its handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Edit(#[from] EditError),

    /// Delete-all attempted without a valid confirmation token
    #[error("Confirmation required: {0}")]
    Confirmation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error(transparent)]
    Feed(#[from] feed_listener::FeedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Edit(EditError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Edit(EditError::Validation(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_input"),
            ApiError::Edit(EditError::Storage(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "not_persisted"),
            ApiError::Confirmation(_) => (StatusCode::CONFLICT, "confirmation_required"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorBody {
            error: code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
