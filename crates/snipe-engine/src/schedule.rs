//! Drop window and the wait for it to open
//!
//! `tokio::time::sleep` rounds to the timer wheel's millisecond granularity
//! and wakes late under load, so waiting for a drop is split in two: a coarse
//! sleep that ends `spin_threshold` before the window opens, then a tight
//! poll on the monotonic clock until the exact instant.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Default lead time for switching from sleeping to polling.
pub const DEFAULT_SPIN_THRESHOLD: Duration = Duration::from_millis(20);

/// Interval during which claim attempts are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRange {
    pub start: Instant,
    pub end: Instant,
}

impl DropRange {
    /// Rejects a window that ends before it starts.
    pub fn new(start: Instant, end: Instant) -> Result<Self> {
        if start > end {
            return Err(Error::Config("drop window ends before it starts".into()));
        }
        Ok(Self { start, end })
    }

    /// Window opening immediately and lasting `window`.
    pub fn starting_now(window: Duration) -> Self {
        let start = Instant::now();
        Self {
            start,
            end: start + window,
        }
    }

    /// Window opening at a wall-clock unix timestamp in milliseconds.
    ///
    /// The wall clock is sampled once and mapped onto the monotonic clock, so
    /// later NTP adjustments do not move the window.
    pub fn from_unix_millis(start_unix_ms: u64, window: Duration) -> Self {
        let now_wall = SystemTime::now();
        let now = Instant::now();
        let target = UNIX_EPOCH + Duration::from_millis(start_unix_ms);
        let start = match target.duration_since(now_wall) {
            Ok(ahead) => now + ahead,
            Err(behind) => now.checked_sub(behind.duration()).unwrap_or(now),
        };
        Self {
            start,
            end: start + window,
        }
    }

    /// Whether the window has closed at `now`.
    pub fn is_closed(&self, now: Instant) -> bool {
        now >= self.end
    }

    /// Time left until the window closes, zero once closed.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.end.saturating_duration_since(now)
    }
}

/// Suspend until `start`, then return the effective race-start instant.
///
/// Returns immediately when `start` is already in the past. Never fails.
pub async fn wait_until(start: Instant, spin_threshold: Duration) -> Instant {
    let now = Instant::now();
    if start <= now {
        return now;
    }

    if let Some(coarse) = start.checked_sub(spin_threshold)
        && coarse > now
    {
        tokio::time::sleep_until(tokio::time::Instant::from_std(coarse)).await;
    }

    loop {
        let now = Instant::now();
        if now >= start {
            return now;
        }
        tokio::task::yield_now().await;
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_window_is_rejected() {
        let now = Instant::now();
        let result = DropRange::new(now + Duration::from_secs(1), now);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn empty_window_is_allowed() {
        let now = Instant::now();
        assert!(DropRange::new(now, now).is_ok());
    }

    #[test]
    fn remaining_saturates_after_close() {
        let range = DropRange::starting_now(Duration::from_millis(100));
        assert!(range.remaining(range.start) == Duration::from_millis(100));
        assert_eq!(range.remaining(range.end + Duration::from_secs(1)), Duration::ZERO);
        assert!(range.is_closed(range.end));
        assert!(!range.is_closed(range.start));
    }

    #[test]
    fn unix_millis_in_future_maps_ahead() {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let range = DropRange::from_unix_millis(now_ms + 5_000, Duration::from_secs(2));
        let ahead = range.start.saturating_duration_since(Instant::now());
        assert!(ahead > Duration::from_secs(4), "got {ahead:?}");
        assert!(ahead <= Duration::from_secs(5), "got {ahead:?}");
        assert_eq!(range.end - range.start, Duration::from_secs(2));
    }

    #[test]
    fn unix_millis_in_past_maps_behind() {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let range = DropRange::from_unix_millis(now_ms - 1_000, Duration::from_secs(2));
        assert!(range.start < Instant::now());
    }

    #[tokio::test]
    async fn past_start_returns_without_waiting() {
        let before = Instant::now();
        let started = wait_until(before - Duration::from_secs(1), DEFAULT_SPIN_THRESHOLD).await;
        assert!(started >= before);
        assert!(before.elapsed() < Duration::from_millis(5));
    }

    #[tokio::test]
    async fn future_start_is_not_undershot() {
        let target = Instant::now() + Duration::from_millis(60);
        let started = wait_until(target, DEFAULT_SPIN_THRESHOLD).await;
        assert!(started >= target);
        assert!(
            started - target < Duration::from_millis(15),
            "overshoot {:?}",
            started - target
        );
    }

    #[tokio::test]
    async fn start_inside_spin_threshold_polls_only() {
        let target = Instant::now() + Duration::from_millis(5);
        let started = wait_until(target, Duration::from_millis(50)).await;
        assert!(started >= target);
    }
}
