//! Configuration error types

use thiserror::Error;

/// Errors raised while assembling process configuration.
///
/// Every variant is fatal: the bot must not start publishing with a
/// half-resolved configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("interval_secs must be greater than 0".into());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: interval_secs must be greater than 0"
        );

        let env_err = Error::MissingEnv("TWITTER_CONSUMER_KEY".into());
        assert_eq!(
            env_err.to_string(),
            "Missing environment variable: TWITTER_CONSUMER_KEY"
        );

        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(
            io_err.to_string().starts_with("I/O error:"),
            "got: {}",
            io_err
        );
    }

    #[test]
    fn toml_errors_convert() {
        let parse: std::result::Result<toml::Table, _> = toml::from_str("not valid {{{{ toml");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Toml(_)), "got: {err:?}");
    }
}
