use crate::services::upload_service::{UploadError, ValidationError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Map pipeline failures to HTTP. The message always names the failing stage.
impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let message = err.to_string();
        match err {
            UploadError::Validation(ValidationError::TooLarge { .. }) => {
                AppError::new(StatusCode::PAYLOAD_TOO_LARGE, message)
            }
            UploadError::Validation(_) => AppError::new(StatusCode::BAD_REQUEST, message),
            UploadError::Unauthenticated(_) => AppError::new(StatusCode::UNAUTHORIZED, message),
            UploadError::Forbidden { .. } => AppError::new(StatusCode::FORBIDDEN, message),
            UploadError::NotFound(_) => AppError::not_found(message),
            UploadError::Probe(_) | UploadError::Remux(_) => {
                AppError::new(StatusCode::UNPROCESSABLE_ENTITY, message)
            }
            UploadError::Store(_) => {
                error!("{}", message);
                AppError::new(StatusCode::BAD_GATEWAY, message)
            }
            UploadError::Lookup { .. } | UploadError::Staging(_) | UploadError::Persist { .. } => {
                error!("{}", message);
                AppError::internal(message)
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        UploadError::from(err).into()
    }
}
