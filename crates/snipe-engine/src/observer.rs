//! Periodic status reporting
//!
//! Read-only view of a race in progress. The observer never touches race
//! state; it only samples `Stats` on a fixed interval and logs the counters
//! an operator watches during a drop.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::stats::{Stats, StatsSnapshot};

/// Spawn a task that logs race progress every `interval`.
///
/// Runs until the returned handle is aborted. Nothing is logged before the
/// first race starts.
pub fn spawn_stats_observer(stats: Arc<Stats>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            report(&stats);
        }
    })
}

/// Log one status line. Returns the snapshot it logged, if any.
fn report(stats: &Stats) -> Option<StatsSnapshot> {
    stats.elapsed()?;
    let snapshot = stats.snapshot();
    info!(
        rps = stats.rate_per_second(),
        total = snapshot.total,
        duplicate = snapshot.duplicate,
        not_allowed = snapshot.not_allowed,
        too_many_requests = snapshot.too_many_requests,
        "race status"
    );
    Some(snapshot)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use claimant::Outcome;

    use super::*;

    #[test]
    fn report_is_silent_before_race_start() {
        let stats = Stats::new();
        assert!(report(&stats).is_none());
    }

    #[test]
    fn report_reflects_current_counters() {
        let stats = Stats::new();
        stats.reset(Instant::now());
        stats.increment(Outcome::Duplicate);
        stats.increment(Outcome::RateLimited);

        let snap = report(&stats).unwrap();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.duplicate, 1);
        assert_eq!(snap.too_many_requests, 1);
    }

    #[test]
    fn report_does_not_mutate_stats() {
        let stats = Stats::new();
        stats.reset(Instant::now());
        stats.increment(Outcome::TransientError);
        let before = stats.snapshot();
        report(&stats);
        report(&stats);
        assert_eq!(stats.snapshot(), before);
    }

    #[tokio::test]
    async fn observer_keeps_running_until_aborted() {
        let stats = Arc::new(Stats::new());
        stats.reset(Instant::now());
        let handle = spawn_stats_observer(Arc::clone(&stats), Duration::from_millis(10));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        handle.abort();
        let err = handle.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
