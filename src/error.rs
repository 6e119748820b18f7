// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Invalid OAuth state")]
    InvalidState,

    #[error("Token refresh rejected: {0}")]
    TokenRefreshRejected(String),

    /// The upstream API answered with an error status. `body` is the
    /// provider's error payload, passed through to the caller.
    #[error("Google API error (HTTP {status}): {body}")]
    GoogleApi { status: u16, body: Value },

    #[error("Google API unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable error code included in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::InvalidState => "invalid_state",
            AppError::TokenRefreshRejected(_) => "token_refresh_failed",
            AppError::GoogleApi { .. } => "google_api_error",
            AppError::UpstreamUnreachable(_) => "upstream_unreachable",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidState | AppError::GoogleApi { .. } => {
                StatusCode::BAD_REQUEST
            }
            AppError::TokenRefreshRejected(_) => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnreachable(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: Value,
    code: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let error = match &self {
            AppError::GoogleApi { status, body } => {
                tracing::warn!(status, body = %body, "Google API returned an error");
                // Google wraps its payload as {"error": {...}}; unwrap one level.
                body.get("error").cloned().unwrap_or_else(|| body.clone())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                Value::String("Failed to store data".to_string())
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                Value::String("Internal server error".to_string())
            }
            AppError::TokenRefreshRejected(msg) => {
                tracing::warn!(error = %msg, "Token refresh rejected by provider");
                Value::String(
                    "Google authorization expired, please reconnect your calendar".to_string(),
                )
            }
            other => Value::String(other.to_string()),
        };

        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
