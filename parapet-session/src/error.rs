//! Error types for session operations.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend failure
    #[error("Session backend error: {0}")]
    Backend(String),
}
