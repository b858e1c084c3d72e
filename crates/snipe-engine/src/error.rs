//! Error types for race setup and race results

/// Errors returned by `ClaimOrchestrator::claim_within_range`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad input, reported before any attempt is made.
    #[error("configuration error: {0}")]
    Config(String),

    /// The race ran and ended without claiming the name.
    #[error(transparent)]
    Race(#[from] RaceError),
}

/// How a race that did not claim the name ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RaceError {
    #[error("name is already owned by another profile")]
    AlreadyClaimed,

    #[error("name was rejected by the service")]
    NameNotAllowed,

    #[error("drop window closed before any attempt succeeded")]
    WindowExpired,

    #[error("every account was retired before the race settled")]
    NoUsableAccounts,
}

impl RaceError {
    /// Label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RaceError::AlreadyClaimed => "already_claimed",
            RaceError::NameNotAllowed => "name_not_allowed",
            RaceError::WindowExpired => "window_expired",
            RaceError::NoUsableAccounts => "no_usable_accounts",
        }
    }
}

/// Result alias for race operations.
pub type Result<T> = std::result::Result<T, Error>;
