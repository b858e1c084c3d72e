//! Per-race account usage state and round-robin checkout
//!
//! Each slot moves through Idle → InFlight → (Idle | Exhausted). Only Idle
//! slots can be checked out, so no account ever has two requests in flight.
//! Every release wakes the dispatch loop so freed accounts are re-dispatched
//! without polling.
//!
//! A pool lives for exactly one race. Usage state is never carried over.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use claimant::Claimant;
use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, warn};

/// Usage state of one account within a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageState {
    Idle,
    InFlight,
    Exhausted,
}

impl UsageState {
    pub fn label(self) -> &'static str {
        match self {
            UsageState::Idle => "idle",
            UsageState::InFlight => "in_flight",
            UsageState::Exhausted => "exhausted",
        }
    }
}

/// How a worker hands an account back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Attempt finished without needing a retry.
    Idle,
    /// Attempt failed retryably and the backoff has elapsed.
    Retried,
    /// Account is unusable for the rest of the race.
    Exhausted,
}

/// An account checked out for one attempt.
#[derive(Clone)]
pub struct Lease {
    pub index: usize,
    pub claimant: Arc<dyn Claimant>,
    /// Retryable failures this account has seen so far in the race.
    pub retries: u32,
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease")
            .field("index", &self.index)
            .field("account", &self.claimant.id())
            .field("retries", &self.retries)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolCounts {
    pub idle: usize,
    pub in_flight: usize,
    pub exhausted: usize,
}

struct Slot {
    claimant: Arc<dyn Claimant>,
    state: UsageState,
    retries: u32,
}

/// Account pool for a single race.
pub struct AccountPool {
    slots: Mutex<Vec<Slot>>,
    next_index: AtomicUsize,
    released: Notify,
}

impl AccountPool {
    /// All accounts start Idle.
    pub fn new(claimants: Vec<Arc<dyn Claimant>>) -> Self {
        info!(accounts = claimants.len(), "account pool initialized");
        let slots = claimants
            .into_iter()
            .map(|claimant| Slot {
                claimant,
                state: UsageState::Idle,
                retries: 0,
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
            next_index: AtomicUsize::new(0),
            released: Notify::new(),
        }
    }

    /// Check out the next Idle account in rotation, marking it InFlight.
    ///
    /// Returns `None` when no account is Idle right now.
    pub async fn check_out(&self) -> Option<Lease> {
        let mut slots = self.slots.lock().await;
        let n = slots.len();
        if n == 0 {
            return None;
        }

        let start = self.next_index.fetch_add(1, Ordering::Relaxed) % n;
        for offset in 0..n {
            let index = (start + offset) % n;
            let slot = &mut slots[index];
            if slot.state == UsageState::Idle {
                slot.state = UsageState::InFlight;
                return Some(Lease {
                    index,
                    claimant: Arc::clone(&slot.claimant),
                    retries: slot.retries,
                });
            }
        }
        None
    }

    /// Hand an InFlight account back and wake the dispatch loop.
    ///
    /// Releasing a slot that is not InFlight is ignored.
    pub async fn release(&self, index: usize, release: Release) {
        {
            let mut slots = self.slots.lock().await;
            let Some(slot) = slots.get_mut(index) else {
                warn!(index, "release for unknown pool slot ignored");
                return;
            };
            if slot.state != UsageState::InFlight {
                warn!(
                    account = slot.claimant.id(),
                    state = slot.state.label(),
                    "release for account not in flight ignored"
                );
                return;
            }
            slot.state = match release {
                Release::Idle => UsageState::Idle,
                Release::Retried => {
                    slot.retries = slot.retries.saturating_add(1);
                    UsageState::Idle
                }
                Release::Exhausted => {
                    warn!(account = slot.claimant.id(), "account exhausted for this race");
                    UsageState::Exhausted
                }
            };
            debug!(
                account = slot.claimant.id(),
                state = slot.state.label(),
                "account released"
            );
        }
        self.released.notify_one();
    }

    /// Whether any account is Idle or InFlight.
    pub async fn has_usable(&self) -> bool {
        self.slots
            .lock()
            .await
            .iter()
            .any(|slot| slot.state != UsageState::Exhausted)
    }

    /// Accounts per usage state, logged when the race ends.
    pub async fn counts(&self) -> PoolCounts {
        let slots = self.slots.lock().await;
        let mut counts = PoolCounts::default();
        for slot in slots.iter() {
            match slot.state {
                UsageState::Idle => counts.idle += 1,
                UsageState::InFlight => counts.in_flight += 1,
                UsageState::Exhausted => counts.exhausted += 1,
            }
        }
        counts
    }

    /// Resolves after the next release.
    ///
    /// A release that happened with no waiter stores a permit, so a release
    /// racing with this call is never lost.
    pub async fn released(&self) {
        self.released.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use claimant::{AccountKind, Proxy, RawClaimResult};

    use super::*;

    struct Named(String);

    impl Claimant for Named {
        fn id(&self) -> &str {
            &self.0
        }

        fn kind(&self) -> AccountKind {
            AccountKind::Microsoft
        }

        fn claim<'a>(
            &'a self,
            _username: &'a str,
            _proxy: Option<&'a Proxy>,
        ) -> Pin<Box<dyn Future<Output = RawClaimResult> + Send + 'a>> {
            Box::pin(async { RawClaimResult::Timeout })
        }
    }

    fn pool_of(n: usize) -> AccountPool {
        AccountPool::new(
            (0..n)
                .map(|i| Arc::new(Named(format!("acct-{i}"))) as Arc<dyn Claimant>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn new_pool_is_all_idle() {
        let pool = pool_of(3);
        assert_eq!(
            pool.counts().await,
            PoolCounts {
                idle: 3,
                in_flight: 0,
                exhausted: 0
            }
        );
        assert!(pool.has_usable().await);
    }

    #[tokio::test]
    async fn empty_pool_checks_out_nothing() {
        let pool = pool_of(0);
        assert_eq!(pool.counts().await, PoolCounts::default());
        assert!(pool.check_out().await.is_none());
        assert!(!pool.has_usable().await);
    }

    #[tokio::test]
    async fn no_account_is_checked_out_twice() {
        let pool = pool_of(3);
        let mut ids = Vec::new();
        while let Some(lease) = pool.check_out().await {
            ids.push(lease.claimant.id().to_string());
        }
        ids.sort();
        assert_eq!(ids, vec!["acct-0", "acct-1", "acct-2"]);
        assert_eq!(pool.counts().await.in_flight, 3);
    }

    #[tokio::test]
    async fn release_makes_account_available_again() {
        let pool = pool_of(1);
        let lease = pool.check_out().await.unwrap();
        assert!(pool.check_out().await.is_none());

        pool.release(lease.index, Release::Idle).await;
        let again = pool.check_out().await.unwrap();
        assert_eq!(again.index, lease.index);
        assert_eq!(again.retries, 0);
    }

    #[tokio::test]
    async fn retried_release_counts_retries() {
        let pool = pool_of(1);
        for expected in 0..3 {
            let lease = pool.check_out().await.unwrap();
            assert_eq!(lease.retries, expected);
            pool.release(lease.index, Release::Retried).await;
        }
    }

    #[tokio::test]
    async fn exhausted_account_is_never_checked_out() {
        let pool = pool_of(2);
        let first = pool.check_out().await.unwrap();
        pool.release(first.index, Release::Exhausted).await;

        let second = pool.check_out().await.unwrap();
        assert_ne!(second.index, first.index);
        pool.release(second.index, Release::Idle).await;

        for _ in 0..4 {
            let lease = pool.check_out().await.unwrap();
            assert_ne!(lease.index, first.index);
            pool.release(lease.index, Release::Idle).await;
        }
    }

    #[tokio::test]
    async fn all_exhausted_means_no_usable() {
        let pool = pool_of(2);
        while let Some(lease) = pool.check_out().await {
            pool.release(lease.index, Release::Exhausted).await;
        }
        assert!(!pool.has_usable().await);
        assert_eq!(pool.counts().await.exhausted, 2);
    }

    #[tokio::test]
    async fn release_of_idle_slot_is_ignored() {
        let pool = pool_of(1);
        pool.release(0, Release::Exhausted).await;
        assert_eq!(pool.counts().await.idle, 1);
        pool.release(7, Release::Idle).await;
        assert_eq!(pool.counts().await.idle, 1);
    }

    #[tokio::test]
    async fn release_wakes_waiter() {
        let pool = Arc::new(pool_of(1));
        let lease = pool.check_out().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.released().await })
        };
        tokio::task::yield_now().await;
        pool.release(lease.index, Release::Idle).await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn release_before_wait_is_not_lost() {
        let pool = pool_of(1);
        let lease = pool.check_out().await.unwrap();
        pool.release(lease.index, Release::Idle).await;

        tokio::time::timeout(Duration::from_secs(1), pool.released())
            .await
            .expect("stored permit should complete the wait");
    }
}
