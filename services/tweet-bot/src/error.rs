//! Service-specific error types

use thiserror::Error;

/// Content generation errors.
///
/// Handlers turn these into `{success: false, error}` responses; they never
/// stop the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API_KEY is not set; content generation is unavailable")]
    MissingApiKey,

    #[error("content generation failed: {0}")]
    Generation(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
