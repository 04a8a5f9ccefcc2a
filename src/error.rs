//! Error taxonomy for Inkbit operations
//!
//! Every denial is terminal and non-retryable; the route layer maps it to an
//! HTTP status via [`Error::status`].

/// The main error type for Inkbit operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage: {0}")]
    Store(String),
}

impl Error {
    /// HTTP status code surfaced to API callers
    pub fn status(&self) -> u16 {
        match self {
            Error::Unauthorized => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::BadRequest(_) => 400,
            Error::Conflict(_) => 409,
            Error::Store(_) => 500,
        }
    }
}

/// Result type alias for Inkbit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Convert any storage-layer error to Error::Store
pub fn err<E: std::error::Error>(e: E) -> Error {
    Error::Store(e.to_string())
}
