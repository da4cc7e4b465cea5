//! Error types for scheduled posting
//!
//! Retry eligibility is decided by variant, not by message text: only
//! `Network` failures are retried.

/// Errors from one generate+publish attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("content source error: {0}")]
    Content(String),

    #[error("message rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether the attempt should be repeated once after the retry delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<publisher::Error> for Error {
    fn from(err: publisher::Error) -> Self {
        match err {
            publisher::Error::NotAuthenticated(msg) => Error::NotAuthenticated(msg),
            publisher::Error::Network(msg) => Error::Network(msg),
            publisher::Error::Rejected { status, message } => Error::Rejected { status, message },
            publisher::Error::InvalidResponse(msg) => Error::InvalidResponse(msg),
        }
    }
}

impl From<twitter_auth::Error> for Error {
    fn from(err: twitter_auth::Error) -> Self {
        Error::Credential(err.to_string())
    }
}

/// Result alias for scheduler operations.
pub type Result<T> = std::result::Result<T, Error>;
