//! Unified error handling for the daemon.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fwupdate_engine::Outcome;
use serde::Serialize;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Engine error: {0}")]
    Engine(#[from] fwupdate_engine::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, outcome) = match &self {
            AppError::Engine(e) => {
                tracing::warn!("Engine error: {:?}", e);
                let status = match e.outcome() {
                    Outcome::InvalidArgument | Outcome::FatalClientError => StatusCode::BAD_REQUEST,
                    Outcome::NotFound => StatusCode::NOT_FOUND,
                    Outcome::Unsupported => StatusCode::NOT_IMPLEMENTED,
                    Outcome::TransientFailure | Outcome::Success => {
                        StatusCode::SERVICE_UNAVAILABLE
                    }
                };
                (status, e.to_string(), Some(e.outcome()))
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "I/O error".to_string(),
                    None,
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            outcome,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
