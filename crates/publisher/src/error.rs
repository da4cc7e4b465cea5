//! Error types for message publishing

/// Errors from a single publish call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("posting endpoint rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from posting endpoint: {0}")]
    InvalidResponse(String),
}

/// Result alias for publish operations.
pub type Result<T> = std::result::Result<T, Error>;
