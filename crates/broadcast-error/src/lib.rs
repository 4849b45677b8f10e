//! HTTP error type for the broadcast API.
//!
//! Handlers return [`AppResult`]; the error renders as
//! `{ "error", "error_code", "status" }`. Storage and push internals work in
//! `anyhow` and surface here as [`AppError::Storage`], whose details are only
//! ever logged.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input: blank names, unknown priority, out-of-range expiry, bad rows
    #[error("Validation error: {0}")]
    Validation(String),

    /// A group, contact or message the request names does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A sibling group with the same name already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire shape of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_code: &'static str,
    pub status: u16,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code clients can branch on
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show the dashboard. Server-side failures collapse to a
    /// generic text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Validation error: {}", msg),
            Self::NotFound(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Storage(_) | Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    pub fn log(&self) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = self.error_code(),
                status = status.as_u16(),
                "Request failed with server error"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = self.error_code(),
                "Request rejected"
            );
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.user_message(),
            error_code: self.error_code(),
            status: self.status_code().as_u16(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(self.body())).into_response()
    }
}
