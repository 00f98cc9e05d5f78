//! Storage-specific error types for SQLite operations.
//!
//! Diesel and r2d2 errors are wrapped here and converted to the
//! database-agnostic error types defined in `loanbook_core`.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use loanbook_core::errors::{DatabaseError, Error, ValidationError};
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
///
/// These errors are internal to the storage layer and are converted to
/// `loanbook_core::Error` before being returned to callers.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value that no longer parses into its domain type.
    #[error("Corrupt column {column}: {message}")]
    CorruptValue { column: &'static str, message: String },

    /// Domain error raised inside a write transaction; kept intact so that
    /// callers still see e.g. a commitment violation rather than a DB error.
    #[error(transparent)]
    Core(Error),
}

impl From<Error> for StorageError {
    fn from(err: Error) -> Self {
        StorageError::Core(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::CorruptValue { column, message } => Error::Validation(
                ValidationError::InvalidInput(format!("{}: {}", column, message)),
            ),
            StorageError::Core(e) => e,
        }
    }
}

/// Extension trait for converting Diesel and r2d2 results to core results.
///
/// Provides `.into_core()` on any `Result<T, diesel::result::Error>` and
/// `Result<T, r2d2::Error>`, going through [`StorageError`].
pub trait IntoCore<T> {
    fn into_core(self) -> loanbook_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> loanbook_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> loanbook_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}
