//! Configuration and I/O errors shared across crates

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration and input files.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Required file not found: {}", .0.display())]
    MissingFile(PathBuf),

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
    fn config_error_carries_reason() {
        let err = Error::Config("window_ms must be greater than 0".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: window_ms must be greater than 0"
        );
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Error::MissingFile(PathBuf::from("/etc/namesnipe.toml"));
        assert_eq!(
            err.to_string(),
            "Required file not found: /etc/namesnipe.toml"
        );
    }

    #[test]
    fn io_error_converts_with_prefix() {
        let err: Error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(err.to_string().starts_with("I/O error:"), "got: {err}");
    }
}
