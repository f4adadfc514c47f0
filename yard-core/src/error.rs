use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YardError {
    /// Caller input failed validation before any store access
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another writer held the partition while allocating
    #[error("Allocation conflict after {attempts} attempt(s)")]
    AllocationConflict { attempts: u32 },

    #[error("Allocation failed (retryable={retryable}): {source}")]
    AllocationFailed {
        retryable: bool,
        #[source]
        source: Box<YardError>,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl YardError {
    /// True when the store rejected the write because another writer held the lock.
    pub fn is_conflict(&self) -> bool {
        match self {
            YardError::AllocationConflict { .. } => true,
            YardError::Database(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            YardError::AllocationFailed { retryable, .. } => *retryable,
            YardError::Validation(_) | YardError::Config(_) => false,
            other => other.is_conflict(),
        }
    }
}

pub type Result<T> = std::result::Result<T, YardError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int) -> YardError {
        YardError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ))
    }

    #[test]
    fn test_busy_is_conflict() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_conflict());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).is_conflict());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_conflict());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(
            YardError::AllocationFailed {
                retryable: true,
                source: Box::new(YardError::AllocationConflict { attempts: 3 }),
            }
            .is_retryable()
        );
        assert!(
            !YardError::AllocationFailed {
                retryable: false,
                source: Box::new(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT)),
            }
            .is_retryable()
        );
        assert!(!YardError::Validation("color".to_string()).is_retryable());
        assert!(!YardError::Internal("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_allocation_failure_keeps_its_cause() {
        use std::error::Error as _;

        let err = YardError::AllocationFailed {
            retryable: false,
            source: Box::new(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT)),
        };
        assert!(err.source().is_some());
        assert!(matches!(
            err,
            YardError::AllocationFailed { ref source, .. } if matches!(**source, YardError::Database(_))
        ));
    }
}
