use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Time-slot conflict carrying the machine-readable report of which
    /// appointments/time blocks collide, so clients can explain the rejection.
    #[error("Scheduling conflict: {message}")]
    SchedulingConflict {
        message: String,
        conflicts: serde_json::Value,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, conflicts) = match self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::SchedulingConflict { message, conflicts } => {
                (StatusCode::CONFLICT, message, Some(conflicts))
            }
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = match conflicts {
            Some(details) => Json(json!({
                "error": message,
                "conflicts": details
            })),
            None => Json(json!({
                "error": message
            })),
        };

        (status, body).into_response()
    }
}
