//! Custom error types for pgbackup
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

use crate::storage::StorageError;

/// The main error type for pgbackup operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors (raised before any destructive action)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Object store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// The dump tool failed or could not be started
    #[error("Dump error: {0}")]
    Dump(String),

    /// The restore tool failed or could not be started
    #[error("Restore error: {0}")]
    Restore(String),

    /// Encryption or decryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Invalid timestamp supplied by an operator
    #[error("Invalid timestamp '{0}': expected YYYY-MM-DDTHH:MM:SS")]
    InvalidTimestamp(String),

    /// Scheduler errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Some targets of a multi-database run failed
    #[error("{failed} of {total} database(s) failed")]
    PartialFailure { failed: usize, total: usize },
}

impl BackupError {
    /// Create a "not found" error for a backup artifact
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<StorageError> for BackupError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => Self::backup_not_found(key),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Result type alias for pgbackup operations
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackupError::Config("S3_BUCKET is required".into());
        assert_eq!(err.to_string(), "Configuration error: S3_BUCKET is required");
        assert!(err.is_config());
    }

    #[test]
    fn test_not_found_error() {
        let err = BackupError::backup_not_found("backup/app_2024-01-01T00:00:00.dump");
        assert_eq!(
            err.to_string(),
            "Backup not found: backup/app_2024-01-01T00:00:00.dump"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_partial_failure_error() {
        let err = BackupError::PartialFailure {
            failed: 1,
            total: 3,
        };
        assert_eq!(err.to_string(), "1 of 3 database(s) failed");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BackupError = io_err.into();
        assert!(matches!(err, BackupError::Io(_)));
    }

    #[test]
    fn test_storage_not_found_maps_to_not_found() {
        let err: BackupError = StorageError::NotFound("backup/x.dump".into()).into();
        assert!(err.is_not_found());

        let err: BackupError = StorageError::DeleteFailed("denied".into()).into();
        assert!(matches!(err, BackupError::Storage(_)));
    }
}
