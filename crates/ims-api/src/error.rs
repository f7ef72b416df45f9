//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps lifecycle and validation errors to HTTP status codes and one JSON
//! body shape. Internal error details are logged, never returned.
//!
//! | Code                   | Status | Meaning                                   |
//! |------------------------|--------|-------------------------------------------|
//! | `NOT_FOUND`            | 404    | Unknown product id                        |
//! | `VALIDATION_ERROR`     | 400    | A field failed validation                 |
//! | `BAD_REQUEST`          | 400    | Unparseable body, path or query           |
//! | `INVALID_STATE`        | 400    | Unknown lifecycle state name              |
//! | `UNAUTHORIZED`         | 401    | Missing or invalid credentials            |
//! | `FORBIDDEN`            | 403    | Caller may not create drafts              |
//! | `INVALID_TRANSITION`   | 409    | No such edge from the current state       |
//! | `ALREADY_IN_STATE`     | 409    | The action would land where it already is |
//! | `ACTION_NOT_PERMITTED` | 409    | The caller's roles do not allow it        |
//! | `STATE_CONFLICT`       | 409    | Lost a race with a concurrent transition  |
//! | `RATE_LIMITED`         | 429    | Per-caller request budget exhausted       |
//! | `INTERNAL_ERROR`       | 500    | Anything else                             |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ims_state::{LifecycleError, LifecycleState};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_TRANSITION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional context for lifecycle conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Build a body without details.
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
                details: None,
            },
        }
    }
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// A request field failed validation (400).
    #[error("{0}")]
    Validation(String),

    /// Request body, path or query could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Unknown lifecycle state name (400).
    #[error("{0}")]
    InvalidState(String),

    /// Authentication failure (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks a non-lifecycle privilege (403).
    #[error("{0}")]
    Forbidden(String),

    /// No edge for the action from the current state (409).
    #[error("{message}")]
    InvalidTransition {
        message: String,
        current_state: LifecycleState,
        action: String,
    },

    /// The action targets the state the product already holds (409).
    #[error("{message}")]
    AlreadyInState {
        message: String,
        current_state: LifecycleState,
        action: String,
    },

    /// The caller's roles do not permit the action (409).
    #[error("{message}")]
    ActionNotPermitted {
        message: String,
        current_state: LifecycleState,
        action: String,
    },

    /// A concurrent transition committed first (409).
    #[error("{0}")]
    Conflict(String),

    /// Rate limit exceeded (429).
    #[error("rate limit exceeded")]
    RateLimited,

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::InvalidState(_) => (StatusCode::BAD_REQUEST, "INVALID_STATE"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidTransition { .. } => (StatusCode::CONFLICT, "INVALID_TRANSITION"),
            Self::AlreadyInState { .. } => (StatusCode::CONFLICT, "ALREADY_IN_STATE"),
            Self::ActionNotPermitted { .. } => (StatusCode::CONFLICT, "ACTION_NOT_PERMITTED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "STATE_CONFLICT"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::InvalidTransition {
                current_state,
                action,
                ..
            }
            | Self::AlreadyInState {
                current_state,
                action,
                ..
            }
            | Self::ActionNotPermitted {
                current_state,
                action,
                ..
            } => Some(json!({ "current_state": current_state, "action": action })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ims_core::ValidationError> for AppError {
    fn from(err: ims_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::NotFound { .. } => Self::NotFound(message),
            LifecycleError::InvalidState { .. } => Self::InvalidState(message),
            LifecycleError::InvalidTransition {
                from,
                action,
                already_in_target: true,
            } => Self::AlreadyInState {
                message: format!("product is already {from}; nothing to {action}"),
                current_state: from,
                action,
            },
            LifecycleError::InvalidTransition {
                from,
                action,
                already_in_target: false,
            } => Self::InvalidTransition {
                message,
                current_state: from,
                action,
            },
            LifecycleError::Unauthorized { action, state, .. } => Self::ActionNotPermitted {
                message,
                current_state: state,
                action,
            },
            LifecycleError::Conflict { .. } => Self::Conflict(message),
            LifecycleError::CreationForbidden => Self::Forbidden(message),
            LifecycleError::Validation(v) => Self::Validation(v.to_string()),
        }
    }
}
