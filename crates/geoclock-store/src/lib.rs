//! Persistence layer for geoclock
//!
//! Provides:
//! - Job site administration
//! - Timesheet sessions, with at most one active session per user
//!   enforced by the database
//! - Employee profiles
//! - Audit log (append-only)
//! - The auth collaborator that names the current user

mod audit;
mod auth;
mod mock;
mod sqlite;
mod traits;

pub use audit::*;
pub use auth::*;
pub use mock::*;
pub use sqlite::*;
pub use traits::*;

use geoclock_api::GeoValueError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    /// A uniqueness or foreign-key rule rejected the write
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<GeoValueError> for StoreError {
    fn from(e: GeoValueError) -> Self {
        StoreError::Invalid(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
