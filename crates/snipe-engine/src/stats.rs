//! Live race statistics
//!
//! One counter per outcome, bumped exactly once per completed attempt. The
//! total is derived from the per-outcome counters at snapshot time, so every
//! snapshot satisfies `total == sum of outcomes` without any locking on the
//! increment path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use claimant::Outcome;
use serde::Serialize;

/// Race-scoped counters shared by workers and display observers.
#[derive(Debug, Default)]
pub struct Stats {
    success: AtomicU64,
    duplicate: AtomicU64,
    not_allowed: AtomicU64,
    too_many_requests: AtomicU64,
    transient: AtomicU64,
    fatal: AtomicU64,
    clock: Mutex<RaceClock>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RaceClock {
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub duplicate: u64,
    pub not_allowed: u64,
    pub too_many_requests: u64,
    pub transient: u64,
    pub fatal: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter and mark `started_at` as the rate reference.
    pub fn reset(&self, started_at: Instant) {
        for counter in self.counters() {
            counter.store(0, Ordering::Relaxed);
        }
        *self.lock_clock() = RaceClock {
            started_at: Some(started_at),
            finished_at: None,
        };
    }

    /// Freeze the race duration at `finished_at`. Counters stay readable.
    pub fn finish(&self, finished_at: Instant) {
        self.lock_clock().finished_at = Some(finished_at);
    }

    /// Count one completed attempt.
    pub fn increment(&self, outcome: Outcome) {
        self.counter(outcome).fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let success = self.success.load(Ordering::Relaxed);
        let duplicate = self.duplicate.load(Ordering::Relaxed);
        let not_allowed = self.not_allowed.load(Ordering::Relaxed);
        let too_many_requests = self.too_many_requests.load(Ordering::Relaxed);
        let transient = self.transient.load(Ordering::Relaxed);
        let fatal = self.fatal.load(Ordering::Relaxed);
        StatsSnapshot {
            total: success + duplicate + not_allowed + too_many_requests + transient + fatal,
            success,
            duplicate,
            not_allowed,
            too_many_requests,
            transient,
            fatal,
        }
    }

    /// Time since the current race started, or its full duration once it has
    /// finished. `None` before the first race.
    pub fn elapsed(&self) -> Option<Duration> {
        let clock = *self.lock_clock();
        let started_at = clock.started_at?;
        Some(match clock.finished_at {
            Some(finished_at) => finished_at.saturating_duration_since(started_at),
            None => started_at.elapsed(),
        })
    }

    /// Completed attempts per second over the race so far. Recomputed per call.
    pub fn rate_per_second(&self) -> f64 {
        match self.elapsed() {
            Some(elapsed) if !elapsed.is_zero() => {
                self.snapshot().total as f64 / elapsed.as_secs_f64()
            }
            _ => 0.0,
        }
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, RaceClock> {
        self.clock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn counter(&self, outcome: Outcome) -> &AtomicU64 {
        match outcome {
            Outcome::Success => &self.success,
            Outcome::Duplicate => &self.duplicate,
            Outcome::NotAllowed => &self.not_allowed,
            Outcome::RateLimited => &self.too_many_requests,
            Outcome::TransientError => &self.transient,
            Outcome::FatalError => &self.fatal,
        }
    }

    fn counters(&self) -> [&AtomicU64; 6] {
        [
            &self.success,
            &self.duplicate,
            &self.not_allowed,
            &self.too_many_requests,
            &self.transient,
            &self.fatal,
        ]
    }
}

/// Record a completed attempt in the process metrics registry.
pub fn record_attempt(outcome: Outcome, duration: Duration) {
    metrics::counter!("snipe_attempts_total", "outcome" => outcome.label()).increment(1);
    metrics::histogram!("snipe_attempt_duration_seconds", "outcome" => outcome.label())
        .record(duration.as_secs_f64());
}

/// Record how a race ended.
pub fn record_race(result: &'static str) {
    metrics::counter!("snipe_races_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;

    #[test]
    fn increments_land_in_matching_counter() {
        let stats = Stats::new();
        stats.increment(Outcome::Duplicate);
        stats.increment(Outcome::RateLimited);
        stats.increment(Outcome::RateLimited);
        stats.increment(Outcome::NotAllowed);

        let snap = stats.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.duplicate, 1);
        assert_eq!(snap.not_allowed, 1);
        assert_eq!(snap.too_many_requests, 2);
        assert_eq!(snap.success, 0);
    }

    #[test]
    fn reset_zeroes_counters_and_sets_start() {
        let stats = Stats::new();
        assert!(stats.elapsed().is_none());
        stats.increment(Outcome::FatalError);

        stats.reset(Instant::now());

        assert_eq!(stats.snapshot(), StatsSnapshot::default());
        assert!(stats.elapsed().is_some());
    }

    #[test]
    fn rate_is_zero_before_start() {
        let stats = Stats::new();
        stats.increment(Outcome::TransientError);
        assert_eq!(stats.rate_per_second(), 0.0);
    }

    #[test]
    fn rate_divides_total_by_elapsed() {
        let stats = Stats::new();
        stats.reset(Instant::now() - Duration::from_secs(2));
        for _ in 0..10 {
            stats.increment(Outcome::RateLimited);
        }
        let rate = stats.rate_per_second();
        assert!(rate > 4.0 && rate <= 5.0, "got {rate}");
    }

    #[test]
    fn rate_is_frozen_once_finished() {
        let stats = Stats::new();
        let started = Instant::now() - Duration::from_secs(4);
        stats.reset(started);
        for _ in 0..8 {
            stats.increment(Outcome::Duplicate);
        }
        stats.finish(started + Duration::from_secs(2));

        assert_eq!(stats.elapsed(), Some(Duration::from_secs(2)));
        assert_eq!(stats.rate_per_second(), 4.0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(stats.rate_per_second(), 4.0);
    }

    #[test]
    fn reset_clears_finish() {
        let stats = Stats::new();
        let started = Instant::now() - Duration::from_secs(1);
        stats.reset(started);
        stats.finish(started);
        assert_eq!(stats.elapsed(), Some(Duration::ZERO));

        stats.reset(Instant::now());
        std::thread::sleep(Duration::from_millis(5));
        assert!(stats.elapsed().unwrap() >= Duration::from_millis(5));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_never_lost() {
        let stats = Arc::new(Stats::new());
        stats.reset(Instant::now());

        let mut handles = Vec::new();
        for i in 0..16 {
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                let outcome = Outcome::ALL[i % Outcome::ALL.len()];
                for _ in 0..500 {
                    stats.increment(outcome);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(stats.snapshot().total, 16 * 500);
    }

    #[test]
    fn snapshot_serializes_all_counters() {
        let stats = Stats::new();
        stats.increment(Outcome::Success);
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["total"], 1);
        assert_eq!(json["success"], 1);
        assert_eq!(json["too_many_requests"], 0);
    }

    #[test]
    fn attempt_metrics_are_recorded_per_outcome() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_attempt(Outcome::RateLimited, Duration::from_millis(40));
        record_attempt(Outcome::Success, Duration::from_millis(90));
        record_race("claimed");

        let output = handle.render();
        assert!(output.contains("snipe_attempts_total"));
        assert!(output.contains("outcome=\"rate_limited\""));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("snipe_races_total"));
        assert!(output.contains("result=\"claimed\""));
    }
}
