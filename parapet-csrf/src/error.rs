use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("no token storage configured and no active session on the request")]
    SessionUnavailable,

    #[error("secure randomness unavailable: {0}")]
    RandomSource(String),

    #[error("token storage error: {0}")]
    Storage(String),
}

pub type CsrfResult<T> = std::result::Result<T, CsrfError>;

/// Configuration and environment failures are fatal middleware errors;
/// they surface through the pipeline as 500-class responses.
impl From<CsrfError> for parapet_core::Error {
    fn from(err: CsrfError) -> Self {
        parapet_core::Error::Internal(err.to_string())
    }
}
