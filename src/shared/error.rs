//! Application Error Types
//!
//! Centralized error handling covering the chat error taxonomy, with
//! Axum integration for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::{Ban, Mute};

/// Application error type.
///
/// Authentication and ban errors are fatal to a connection; every other
/// variant is scoped to the single action that triggered it and is reported
/// only to the originating connection.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Banned")]
    Banned(Ban),

    #[error("Muted")]
    Muted(Mute),

    #[error("Blocked")]
    Blocked,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Wire identifier for structured error events.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::Banned(_) => "banned",
            AppError::Muted(_) => "muted",
            AppError::Blocked => "blocked",
            AppError::NotFound(_) => "not_found",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::Validation(_) => "validation",
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => "store",
        }
    }

    /// True when the error must terminate the connection rather than
    /// just reject the triggering action.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Unauthenticated(_) | AppError::Banned(_))
    }

    /// Client-facing message. Store failures are collapsed to a generic
    /// message so internals never leak over the wire.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_) => {
                "A temporary error occurred, please try again".into()
            }
            AppError::Muted(mute) => match mute.expires_at {
                Some(until) => format!("You are muted until {}", until.to_rfc3339()),
                None => "You are muted".into(),
            },
            AppError::Blocked => "This user cannot be messaged".into(),
            other => other.to_string(),
        }
    }
}

/// Error response body for the HTTP surface
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, 10001, msg.clone()),
            AppError::Banned(_) => (StatusCode::FORBIDDEN, 10002, "Banned".into()),
            AppError::Muted(_) => (StatusCode::FORBIDDEN, 10003, "Muted".into()),
            AppError::Blocked => (StatusCode::FORBIDDEN, 10004, "Blocked".into()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 10005, msg.clone()),
            AppError::PermissionDenied(msg) => (StatusCode::FORBIDDEN, 10006, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 10007, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "Internal server error".into())
            }
        };

        let body = ErrorResponse { code, message };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_connection_scoped() {
        assert!(AppError::Unauthenticated("bad token".into()).is_fatal());
        assert!(!AppError::Blocked.is_fatal());
        assert!(!AppError::Validation("empty".into()).is_fatal());
    }

    #[test]
    fn store_errors_are_generic_on_the_wire() {
        let err = AppError::Internal("pool exhausted".into());
        assert_eq!(err.kind(), "store");
        assert!(!err.client_message().contains("pool"));
    }
}
