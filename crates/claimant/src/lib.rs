//! Claim capability shared by the race engine and account implementations
//!
//! Defines the `Claimant` trait that decouples the race engine from the way a
//! particular account kind talks to the identity service. The engine only ever
//! asks an account to issue one claim request and hands the raw result to the
//! outcome classifier; credential acquisition happens before an account is
//! constructed and is invisible here.

pub mod proxy;

pub use proxy::{Proxy, ProxyAuth};

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Authentication mechanism an account was provisioned with.
///
/// The kind decides which claim request the account issues:
/// - GiftCode and GamePass accounts have no profile yet and create one
/// - Microsoft accounts already own a profile and rename it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    GiftCode,
    GamePass,
    Microsoft,
}

impl AccountKind {
    /// Label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::GiftCode => "gift_code",
            AccountKind::GamePass => "game_pass",
            AccountKind::Microsoft => "microsoft",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What came back from one claim request, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawClaimResult {
    /// The service answered with an HTTP status and body.
    Response { status: u16, body: String },
    /// The request never produced a response (connect, TLS, proxy failure).
    Transport(String),
    /// The engine's per-request deadline elapsed first.
    Timeout,
}

/// Classified result of one claim attempt.
///
/// Success, Duplicate and NotAllowed end the race. RateLimited and
/// TransientError are retried on the same account after a backoff.
/// FatalError retires only the account that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Duplicate,
    NotAllowed,
    RateLimited,
    TransientError,
    FatalError,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::Success,
        Outcome::Duplicate,
        Outcome::NotAllowed,
        Outcome::RateLimited,
        Outcome::TransientError,
        Outcome::FatalError,
    ];

    /// Label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Duplicate => "duplicate",
            Outcome::NotAllowed => "not_allowed",
            Outcome::RateLimited => "rate_limited",
            Outcome::TransientError => "transient_error",
            Outcome::FatalError => "fatal_error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One credentialed identity able to issue claim requests.
///
/// Implementations hold whatever session data their kind needs. The engine
/// guarantees at most one `claim` call per account is in flight at a time.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Claimant>`).
pub trait Claimant: Send + Sync {
    /// Stable identifier for logging (never the credential itself).
    fn id(&self) -> &str;

    fn kind(&self) -> AccountKind;

    /// Attempt to claim `username` through `proxy`, or directly when `None`.
    ///
    /// Must not retry internally; every call is exactly one request.
    fn claim<'a>(
        &'a self,
        username: &'a str,
        proxy: Option<&'a Proxy>,
    ) -> Pin<Box<dyn Future<Output = RawClaimResult> + Send + 'a>>;
}
