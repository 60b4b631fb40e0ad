//! API error types and responses.
//!
//! This module defines the standard error format for all API responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use aquanode_device::DeviceError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource does not support the method.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The device runtime is not accepting requests.
    #[error("device unavailable")]
    DeviceUnavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::Conflict(_) => "conflict",
            Self::DeviceUnavailable => "device_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::BadRequest(msg) => Self::BadRequest(msg),
            DeviceError::InvalidId(e) => Self::BadRequest(e.to_string()),
            DeviceError::InvalidLevel(e) => Self::BadRequest(e.to_string()),
            DeviceError::MethodNotAllowed(msg) => Self::MethodNotAllowed(msg.to_string()),
            DeviceError::InvalidTransition { from, to } => {
                Self::Conflict(format!("cannot transition from {from:?} to {to:?}"))
            }
            DeviceError::RuntimeClosed | DeviceError::RegistrationUnavailable(_) => {
                tracing::error!(error = %err, "Device runtime unavailable");
                Self::DeviceUnavailable
            }
            DeviceError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                Self::Internal(msg)
            }
        }
    }
}
