// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::sync::gateway::GatewayError;

/// Which remote write a failed mutation attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Update,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOp::Create => "create",
            WriteOp::Update => "update",
            WriteOp::Delete => "delete",
        })
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No active session")]
    NoActiveSession,

    #[error("Owner mismatch: {0}")]
    OwnerMismatch(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The optimistic change has already been rolled back. `restored` is the
    /// entity as the cache holds it again (`None` after a failed create).
    #[error("Remote {op} of {id} failed: {source}")]
    RemoteWriteFailed {
        op: WriteOp,
        id: String,
        restored: Option<serde_json::Value>,
        #[source]
        source: GatewayError,
    },

    /// The cached snapshot was kept unchanged.
    #[error("Remote read failed: {0}")]
    RemoteReadFailed(#[source] GatewayError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    /// Entity the client should redraw after a rolled-back write
    #[serde(skip_serializing_if = "Option::is_none")]
    restored: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let restored = match &self {
            AppError::RemoteWriteFailed { restored, .. } => restored.clone(),
            _ => None,
        };
        let (status, error, details) = match &self {
            AppError::NoActiveSession => (StatusCode::UNAUTHORIZED, "no_active_session", None),
            AppError::OwnerMismatch(msg) => {
                (StatusCode::FORBIDDEN, "owner_mismatch", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::RemoteWriteFailed { op, id, source, .. } => {
                tracing::warn!(%op, id = %id, error = %source, "Remote write failed, rolled back");
                (
                    StatusCode::BAD_GATEWAY,
                    "remote_write_failed",
                    Some(format!("{} of {} was rolled back", op, id)),
                )
            }
            AppError::RemoteReadFailed(source) => {
                tracing::warn!(error = %source, "Remote read failed");
                (StatusCode::BAD_GATEWAY, "remote_read_failed", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            restored,
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// Whether this error left local state rolled back after a failed write.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, AppError::RemoteWriteFailed { .. })
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
