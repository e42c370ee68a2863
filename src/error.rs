/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - JWE / JWT エラーを統一的に変換
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::services::auth::JwtError;
use crate::services::jwe::JweError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<JweError> for AppError {
    fn from(e: JweError) -> Self {
        match e {
            // Key material and algorithm problems are caller input errors.
            JweError::UnsupportedAlgorithm(_)
            | JweError::UnsupportedKeyAlgorithm(_)
            | JweError::UnsupportedCompression(_)
            | JweError::UnsupportedFormat(_)
            | JweError::InvalidKeySize { .. } => AppError::bad_request("INVALID_JWE_PARAMS", e.to_string()),

            JweError::Malformed(_)
            | JweError::AlgorithmMismatch { .. }
            | JweError::Decrypt(_)
            | JweError::Payload(_)
            | JweError::MissingJwt => AppError::bad_request("JWE_DECRYPTION_FAILED", e.to_string()),

            JweError::Random(_) | JweError::Encrypt(_) => {
                warn!(error = %e, "JWE operation failed");
                AppError::Internal
            }
        }
    }
}

impl From<JwtError> for AppError {
    fn from(e: JwtError) -> Self {
        AppError::bad_request("INVALID_TOKEN", e.to_string())
    }
}
