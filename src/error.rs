use crate::fcm_sender::FcmError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("No valid FCM tokens provided")]
    NoValidTokens,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("FCM error: {0}")]
    Fcm(#[from] FcmError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Tokio task join error: {0}")]
    TokioJoin(#[from] tokio::task::JoinError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "Validation failed",
                    "details": details,
                })),
            )
                .into_response(),
            ServiceError::NoValidTokens => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "No valid FCM tokens provided",
                })),
            )
                .into_response(),
            ServiceError::InvalidBody(detail) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "Invalid request body",
                    "details": [detail],
                })),
            )
                .into_response(),
            ServiceError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({
                    "success": false,
                    "error": "Method not allowed",
                })),
            )
                .into_response(),
            ServiceError::Fcm(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to send notification",
                    "code": e.error_code(),
                    "message": e.to_string(),
                })),
            )
                .into_response(),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Internal server error",
                    "code": "internal_error",
                    "message": other.to_string(),
                })),
            )
                .into_response(),
        }
    }
}

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;
