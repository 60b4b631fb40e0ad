//! Error types for the device runtime.
//!
//! Transient connectivity problems never surface from the lifecycle
//! controller; they are retried. The variants here cover what a caller of the
//! resource can observe, plus the failures the handshake logs and retries.

use aquanode_core::{IdError, LevelError};
use thiserror::Error;

use crate::lifecycle::LifecyclePhase;

/// A result type using `DeviceError`.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur in device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The requested lifecycle transition is not valid.
    #[error("invalid lifecycle transition: cannot transition from {from:?} to {to:?}")]
    InvalidTransition {
        /// The current phase.
        from: LifecyclePhase,
        /// The requested target phase.
        to: LifecyclePhase,
    },

    /// The registration request got no response (timeout or transport failure).
    #[error("registration endpoint unavailable: {0}")]
    RegistrationUnavailable(String),

    /// A write request carried neither a valid mode nor a valid rate.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The resource variant does not support the requested operation.
    #[error("method not allowed: {0}")]
    MethodNotAllowed(&'static str),

    /// The device runtime has shut down and no longer accepts events.
    #[error("device runtime is not running")]
    RuntimeClosed,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid identifier in configuration.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Invalid quantity in configuration.
    #[error("invalid level: {0}")]
    InvalidLevel(#[from] LevelError),
}

impl DeviceError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) | Self::InvalidId(_) | Self::InvalidLevel(_) => 400,
            Self::MethodNotAllowed(_) => 405,
            Self::InvalidTransition { .. } => 409,
            Self::RuntimeClosed | Self::RegistrationUnavailable(_) => 503,
            Self::Config(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::RegistrationUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        assert_eq!(DeviceError::BadRequest("x".into()).http_status_code(), 400);
        assert_eq!(
            DeviceError::MethodNotAllowed("delete").http_status_code(),
            405
        );
        assert_eq!(
            DeviceError::InvalidTransition {
                from: LifecyclePhase::AwaitingConnectivity,
                to: LifecyclePhase::Operational,
            }
            .http_status_code(),
            409
        );
        assert_eq!(DeviceError::RuntimeClosed.http_status_code(), 503);
    }

    #[test]
    fn only_registration_failures_are_retriable() {
        assert!(DeviceError::RegistrationUnavailable("timeout".into()).is_retriable());
        assert!(!DeviceError::BadRequest("x".into()).is_retriable());
        assert!(!DeviceError::RuntimeClosed.is_retriable());
    }
}
