//! Error types for the fieldbook data layer.

use thiserror::Error;

/// Result type alias using fieldbook's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fieldbook operations.
///
/// Failures are scoped to the operation that produced them: nothing here is
/// retried automatically and nothing is fatal to the process. Callers decide
/// retry policy.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated (email, place_id, tag name).
    /// The losing writer is rejected, never silently merged.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Foreign key points at a nonexistent or mismatched-owner row.
    #[error("Referential violation: {0}")]
    ForeignKey(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(uuid::Uuid),

    /// Organisation not found
    #[error("Organisation not found: {0}")]
    OrganisationNotFound(uuid::Uuid),

    /// Appointment not found
    #[error("Appointment not found: {0}")]
    AppointmentNotFound(uuid::Uuid),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Route not found
    #[error("Route not found: {0}")]
    RouteNotFound(uuid::Uuid),

    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(uuid::Uuid),

    /// Invalid input: failed validation or an out-of-set enumeration value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
