//! Error types for account and egress setup

/// Errors from building clients and reading account or proxy lists.
///
/// Claim requests themselves never fail with this type; their failures are
/// reported as `RawClaimResult` values for the engine to classify.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP client setup failed: {0}")]
    Http(String),

    #[error("invalid proxy {line}: {reason}")]
    InvalidProxy { line: String, reason: String },

    #[error("invalid account at {origin}:{line_no}: {reason}")]
    InvalidAccount {
        origin: String,
        line_no: usize,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for setup operations.
pub type Result<T> = std::result::Result<T, Error>;
