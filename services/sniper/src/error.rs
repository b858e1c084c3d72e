//! Service-specific error types

use thiserror::Error;

/// Startup failures that are reported before any claim attempt.
///
/// Race results never pass through here; they come back from the engine as
/// `snipe_engine::Error` and are mapped straight to an exit code.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error("no accounts")]
    NoAccounts,

    #[error("no target username given")]
    MissingUsername,
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
