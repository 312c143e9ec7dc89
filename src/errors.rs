//! Error types for the auth-state adapter

use thiserror::Error;

/// Result type for adapter operations
pub type AuthStateResult<T> = Result<T, AuthStateError>;

/// Errors that can occur while persisting or loading session state
#[derive(Debug, Error)]
pub enum AuthStateError {
    /// The backing document collection rejected or failed an operation
    #[error("Collection error: {0}")]
    Collection(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Payload shape the store cannot hold
    #[error("Invalid payload for {id}: {reason}")]
    InvalidPayload { id: String, reason: String },
}

impl From<serde_json::Error> for AuthStateError {
    fn from(e: serde_json::Error) -> Self {
        AuthStateError::Serialization(e.to_string())
    }
}
