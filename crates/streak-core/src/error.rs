//! Unified error handling for streak-core

use thiserror::Error;

use crate::services::quota::AdmissionError;

/// Core error type for streak-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Admission(#[from] AdmissionError),
}

/// Result type alias for streak-core
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::validation("Missing habit name");
        assert_eq!(err.to_string(), "Validation error: Missing habit name");
    }

    #[test]
    fn test_admission_error_is_transparent() {
        let err: Error = AdmissionError::NotFound("Habit abc".to_string()).into();
        assert_eq!(err.to_string(), "Not found: Habit abc");
        assert!(matches!(err, Error::Admission(AdmissionError::NotFound(_))));
    }
}
