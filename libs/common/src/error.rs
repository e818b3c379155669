//! Store-level error types shared by every persistence backend
//!
//! Both the PostgreSQL stores and the in-memory stores used in tests report
//! failures through [`DatabaseError`], so callers can tell a uniqueness
//! collision apart from a broken connection without knowing the backend.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// A unique constraint rejected the write
    #[error("Duplicate value for {0}")]
    Duplicate(String),

    /// The targeted row does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Session or cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),
}

impl DatabaseError {
    /// Classify a query error, lifting unique violations into [`DatabaseError::Duplicate`]
    pub fn from_query(err: SqlxError) -> Self {
        if let SqlxError::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return DatabaseError::Duplicate(constraint.to_string());
            }
        }
        DatabaseError::Query(err)
    }

    /// Whether this error reports a uniqueness collision
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DatabaseError::Duplicate(_))
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
