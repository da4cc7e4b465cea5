//! Error types for OAuth 1.0a authorization and credential storage

/// Errors from the authorization flow and credential store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("cannot obtain request token: {0}")]
    RequestToken(String),

    #[error("cannot obtain access token: {0}")]
    AccessToken(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("PIN unavailable: {0}")]
    PinUnavailable(String),

    #[error("no authorization is waiting for a PIN")]
    NoPendingPin,

    #[error("authorization stopped without a result in state {0}")]
    Stalled(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
