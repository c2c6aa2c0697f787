//! Error kinds surfaced by the intake components.
//!
//! Components return the specific kind; the walk-in workflow propagates
//! the first one it meets without translating it. The HTTP layer maps
//! kinds to status codes (see `api::error`).

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid queue status: {0}")]
    InvalidStatus(String),

    #[error("Storage error: {0}")]
    Storage(DatabaseError),

    #[error("Storage operation timed out")]
    Timeout,
}

impl IntakeError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        IntakeError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<DatabaseError> for IntakeError {
    fn from(err: DatabaseError) -> Self {
        if err.is_timeout() {
            return IntakeError::Timeout;
        }
        if err.is_unique_violation() {
            return IntakeError::Conflict(err.to_string());
        }
        match err {
            DatabaseError::NotFound { entity_type, id } => IntakeError::NotFound {
                entity: entity_type,
                id,
            },
            other => IntakeError::Storage(other),
        }
    }
}

impl From<rusqlite::Error> for IntakeError {
    fn from(err: rusqlite::Error) -> Self {
        DatabaseError::from(err).into()
    }
}

/// Failures that stop the service from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Cannot prepare data directory: {0}")]
    DataDir(std::io::Error),

    #[error("Cannot open database: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Cannot seed screening questions: {0}")]
    Seed(#[from] IntakeError),

    #[error("Cannot start API server: {0}")]
    Server(std::io::Error),
}
