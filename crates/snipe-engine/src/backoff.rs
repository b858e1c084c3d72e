//! Retry delay for rate-limited and transient attempts

use std::time::Duration;

use rand::RngExt;

/// Capped exponential backoff with uniform jitter.
///
/// The n-th consecutive retry of an account waits `min(base * 2^n, max)`
/// plus up to `jitter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(50),
            max: Duration::from_millis(1000),
            jitter: Duration::from_millis(25),
        }
    }
}

impl Backoff {
    /// Delay before an account's next attempt after `retries` prior retries.
    pub fn delay(&self, retries: u32) -> Duration {
        let factor = 2u32.saturating_pow(retries.min(16));
        let capped = self.base.saturating_mul(factor).min(self.max);
        capped + self.jitter_sample()
    }

    fn jitter_sample(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}
