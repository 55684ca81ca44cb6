//! Common error types for the neuron database stores

use thiserror::Error;

/// Common result type for store and reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ndb crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A record with the same identity already exists
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record failed a validation rule
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A record points at another record that cannot be resolved
    #[error("Dangling reference: {entity} {id} has no resolvable {reference}")]
    DanglingReference {
        entity: &'static str,
        id: String,
        reference: &'static str,
    },

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a dangling-reference value for an integrity warning
    pub fn dangling(entity: &'static str, id: impl ToString, reference: &'static str) -> Self {
        Error::DanglingReference {
            entity,
            id: id.to_string(),
            reference,
        }
    }

    /// True for SQLite write contention errors that are worth retrying
    pub fn is_lock_error(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let message = db_err.to_string();
                message.contains("database is locked") || message.contains("database table is locked")
            }
            _ => false,
        }
    }
}
