//! Unified error hierarchy for RecoveryRS
//!
//! Provides the top-level error type for service operations, with severity
//! classification and integration with the tracing system.

use chrono::NaiveDate;
use thiserror::Error;

use crate::database::DatabaseError;
use crate::models::ReadingValidationError;
use crate::training_load::LoadError;

/// Top-level error type for all RecoveryRS operations
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Caller supplied an end date before the start date
    #[error("Invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Storage errors raised by a repository
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event channel errors
    #[error("Event error: {0}")]
    Event(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ReadingValidationError> for RecoveryError {
    fn from(err: ReadingValidationError) -> Self {
        RecoveryError::Validation(err.to_string())
    }
}

impl From<LoadError> for RecoveryError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::InvalidDateRange { start, end } => RecoveryError::InvalidRange { start, end },
        }
    }
}

/// Result type alias for RecoveryRS operations
pub type Result<T> = std::result::Result<T, RecoveryError>;

impl RecoveryError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RecoveryError::Database(DatabaseError::Sqlite(_)) | RecoveryError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RecoveryError::Validation(_) => ErrorSeverity::Warning,
            RecoveryError::InvalidRange { .. } => ErrorSeverity::Warning,
            RecoveryError::Database(DatabaseError::NotFound(_)) => ErrorSeverity::Warning,
            RecoveryError::Database(_) => ErrorSeverity::Error,
            RecoveryError::Event(_) => ErrorSeverity::Warning,
            RecoveryError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            RecoveryError::InvalidRange { start, end } => {
                format!(
                    "The end date {} must not be before the start date {}.",
                    end, start
                )
            }
            RecoveryError::Database(DatabaseError::Sqlite(_)) => {
                "Unable to access the recovery database. Please check your configuration."
                    .to_string()
            }
            RecoveryError::Validation(reason) => format!("Invalid input: {}", reason),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = RecoveryError::Validation("sleep quality out of range".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = RecoveryError::Internal("test".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_error_retryable() {
        let err = RecoveryError::Io(std::io::Error::new(std::io::ErrorKind::Interrupted, "disk busy"));
        assert!(err.is_retryable());

        // A poisoned lock stays poisoned
        let err = RecoveryError::Database(DatabaseError::LockPoisoned("readings".to_string()));
        assert!(!err.is_retryable());

        let err = RecoveryError::Validation("test".to_string());
        assert!(!err.is_retryable());

        let err = RecoveryError::Database(DatabaseError::NotFound("reading r1".to_string()));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_load_error_conversion() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err: RecoveryError = LoadError::InvalidDateRange { start, end }.into();

        assert!(matches!(err, RecoveryError::InvalidRange { .. }));
        assert!(err.user_message().contains("must not be before"));
    }
}
