//! Outcome classification for claim responses
//!
//! Maps what the services API sent back to one of the six outcomes the race
//! loop acts on. Anything not positively recognized falls through to
//! `TransientError`: retrying a misread response costs one request, while
//! ending the race on one can cost the name.

use claimant::{Outcome, RawClaimResult};

/// Body markers meaning another profile already owns the name.
const DUPLICATE_PATTERNS: &[&str] = &["duplicate", "already taken", "already exists"];

/// Body markers meaning the service refuses the name itself.
const NOT_ALLOWED_PATTERNS: &[&str] = &[
    "not_allowed",
    "constraint_violation",
    "invalid profile name",
    "not allowed",
];

/// Classify one completed attempt for `username`.
pub fn classify(username: &str, raw: &RawClaimResult) -> Outcome {
    match raw {
        RawClaimResult::Response { status, body } => classify_response(username, *status, body),
        RawClaimResult::Transport(_) | RawClaimResult::Timeout => Outcome::TransientError,
    }
}

/// Classify a response by HTTP status and body.
///
/// - 200 counts as Success only when the body's `name` is the target name
/// - 400/403 with a duplicate or not-allowed marker end the race
/// - 403 without a marker and 401 are credential failures (FatalError)
/// - 429 is RateLimited
/// - 408, 5xx and everything else are TransientError
pub fn classify_response(username: &str, status: u16, body: &str) -> Outcome {
    match status {
        200 if confirms_claim(username, body) => Outcome::Success,
        200 => Outcome::TransientError,
        400 | 403 => match rejection(body) {
            Some(outcome) => outcome,
            None if status == 403 => Outcome::FatalError,
            None => Outcome::TransientError,
        },
        401 => Outcome::FatalError,
        429 => Outcome::RateLimited,
        408 | 500..=599 => Outcome::TransientError,
        _ => Outcome::TransientError,
    }
}

/// The profile JSON returned on success carries the claimed name.
fn confirms_claim(username: &str, body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("name")?.as_str().map(|n| n.eq_ignore_ascii_case(username)))
        .unwrap_or(false)
}

/// Look for a rejection marker in the fields the service uses to explain a
/// refusal. Error bodies echo the request path, which carries the target
/// name, so the rest of a JSON body is never scanned.
fn rejection(body: &str) -> Option<Outcome> {
    let lower = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => [
            json.pointer("/details/status"),
            json.get("error"),
            json.get("errorMessage"),
        ]
        .into_iter()
        .flatten()
        .filter_map(serde_json::Value::as_str)
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("\n"),
        Err(_) => body.to_lowercase(),
    };
    if DUPLICATE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(Outcome::Duplicate);
    }
    if NOT_ALLOWED_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(Outcome::NotAllowed);
    }
    None
}
