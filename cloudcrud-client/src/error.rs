//! Error types for the CRUD client.

use thiserror::Error;

/// Result type for client and database operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by a remote database call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure; the request may not have reached the server.
    #[error("network error: {0}")]
    Network(String),

    /// The server rejected the request.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The record id does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The entity was never saved, so it has no id to act on.
    #[error("record has no id")]
    MissingRecordId,

    /// The cursor was not issued by this database or has already been used.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// The server answered with something the client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Returns true if the error means the target record does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound(_) => true,
            ClientError::Server { status, .. } => *status == 404,
            _ => false,
        }
    }
}
