//! Common error types for aquanode.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the aquanode system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// A quantity could not be parsed.
    #[error("invalid level: {0}")]
    InvalidLevel(#[from] crate::level::LevelError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceClass, Level};

    #[test]
    fn converts_component_errors() {
        let err: CoreError = "bad class".parse::<DeviceClass>().unwrap_err().into();
        assert!(matches!(err, CoreError::InvalidId(_)));

        let err: CoreError = "abc".parse::<Level>().unwrap_err().into();
        assert!(err.to_string().starts_with("invalid level"));
    }
}
