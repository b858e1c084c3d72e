//! Race loop and claim workers
//!
//! The orchestrator owns nothing between races except the shared `Stats`.
//! Each call to `claim_within_range` builds a fresh account pool and proxy
//! router, waits for the window to open, then keeps every Idle account busy
//! until the race settles.
//!
//! The terminal signal is a `watch` channel holding `Option<Terminal>`. The
//! first terminal outcome sticks, with one exception: a `Claimed` signal
//! replaces an earlier `Lost`, since a success from the service is final no
//! matter what another account heard first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use claimant::{AccountKind, Claimant, Outcome, Proxy, RawClaimResult};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::backoff::Backoff;
use crate::classify::classify;
use crate::error::{Error, RaceError, Result};
use crate::pool::{AccountPool, Lease, Release};
use crate::router::ProxyRouter;
use crate::schedule::{DEFAULT_SPIN_THRESHOLD, DropRange, wait_until};
use crate::stats::{Stats, record_attempt, record_race};

/// Tunables for one race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceConfig {
    /// Upper bound on a single claim request. Further capped by the time
    /// left in the window.
    pub request_timeout: Duration,
    pub backoff: Backoff,
    /// How long before the window opens to stop sleeping and start polling.
    pub spin_threshold: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(1500),
            backoff: Backoff::default(),
            spin_threshold: DEFAULT_SPIN_THRESHOLD,
        }
    }
}

/// A won race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimSuccess {
    pub username: String,
    pub account_id: String,
    pub kind: AccountKind,
    /// Display form of the proxy used, `None` for the direct path.
    pub proxy: Option<String>,
    /// Time from race start to the confirming response.
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
enum Terminal {
    Claimed(ClaimSuccess),
    Lost(RaceError),
}

/// State shared by the race loop and every worker of one race.
struct Race {
    username: String,
    range: DropRange,
    started: Instant,
    pool: AccountPool,
    router: ProxyRouter,
    stats: Arc<Stats>,
    config: RaceConfig,
    signal: watch::Sender<Option<Terminal>>,
}

impl Race {
    fn terminal(&self) -> Option<Terminal> {
        self.signal.borrow().clone()
    }

    fn is_settled(&self) -> bool {
        self.signal.borrow().is_some()
    }

    /// Raise a terminal signal. Returns whether it took effect.
    fn settle(&self, terminal: Terminal) -> bool {
        self.signal.send_if_modified(|current| {
            let replace = match current {
                None => true,
                Some(Terminal::Lost(_)) => matches!(terminal, Terminal::Claimed(_)),
                Some(Terminal::Claimed(_)) => false,
            };
            if replace {
                *current = Some(terminal);
            }
            replace
        })
    }
}

/// Runs claim races and exposes their live statistics.
pub struct ClaimOrchestrator {
    config: RaceConfig,
    stats: Arc<Stats>,
}

impl ClaimOrchestrator {
    pub fn new(config: RaceConfig) -> Self {
        Self {
            config,
            stats: Arc::new(Stats::new()),
        }
    }

    /// Statistics of the current (or most recent) race, for observers.
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// Race every account for `username` inside `range`.
    ///
    /// Returns a `Config` error before any attempt when the username is empty
    /// or no accounts are given. Otherwise returns exactly one of: the
    /// success, or the `RaceError` that ended the race. An empty `proxies`
    /// list sends every attempt over the direct path.
    pub async fn claim_within_range(
        &self,
        username: &str,
        range: DropRange,
        accounts: Vec<Arc<dyn Claimant>>,
        proxies: Vec<Proxy>,
    ) -> Result<ClaimSuccess> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Config("username must not be empty".into()));
        }
        if accounts.is_empty() {
            return Err(Error::Config("no accounts".into()));
        }

        let race_id = format!("race_{}", uuid::Uuid::new_v4().simple());
        let span = info_span!("race", race_id = %race_id, username = %username);
        self.run(username, range, accounts, proxies)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        username: &str,
        range: DropRange,
        accounts: Vec<Arc<dyn Claimant>>,
        proxies: Vec<Proxy>,
    ) -> Result<ClaimSuccess> {
        let pool = AccountPool::new(accounts);
        let router = ProxyRouter::new(proxies);
        info!(
            proxies = router.proxy_count(),
            wait_ms = range.start.saturating_duration_since(Instant::now()).as_millis() as u64,
            window_ms = (range.end - range.start).as_millis() as u64,
            "waiting for drop"
        );

        let started = wait_until(range.start, self.config.spin_threshold).await;
        self.stats.reset(started);
        info!("race started");

        let (signal, mut settled_rx) = watch::channel(None);
        let race = Arc::new(Race {
            username: username.to_string(),
            range,
            started,
            pool,
            router,
            stats: Arc::clone(&self.stats),
            config: self.config,
            signal,
        });

        let mut tasks = JoinSet::new();
        loop {
            if race.is_settled()
                || race.range.is_closed(Instant::now())
                || !race.pool.has_usable().await
            {
                break;
            }

            dispatch_idle(&race, &mut tasks).await;

            tokio::select! {
                _ = settled_rx.changed() => {}
                _ = tokio::time::sleep_until(tokio::time::Instant::from_std(race.range.end)) => {}
                _ = race.pool.released() => {}
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "claim worker failed");
                    }
                }
            }
        }

        // Every in-flight attempt is bounded by the request timeout and every
        // backoff ends on settlement, so the drain is short. A success among
        // the stragglers still wins, and nothing touches the stats once this
        // function returns.
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "claim worker failed");
            }
        }

        let result = match race.terminal() {
            Some(Terminal::Claimed(success)) => Ok(success),
            Some(Terminal::Lost(reason)) => Err(reason),
            None if !race.pool.has_usable().await => Err(RaceError::NoUsableAccounts),
            None => Err(RaceError::WindowExpired),
        };
        finish(&race, result).await.map_err(Error::from)
    }
}

/// Launch one worker per currently Idle account.
async fn dispatch_idle(race: &Arc<Race>, tasks: &mut JoinSet<()>) {
    while let Some(lease) = race.pool.check_out().await {
        if race.is_settled() || race.range.is_closed(Instant::now()) {
            race.pool.release(lease.index, Release::Idle).await;
            return;
        }
        let proxy = race.router.next();
        tasks.spawn(attempt(Arc::clone(race), lease, proxy).instrument(Span::current()));
    }
}

/// One claim attempt, from request to release.
async fn attempt(race: Arc<Race>, lease: Lease, proxy: Option<Arc<Proxy>>) {
    let sent_at = Instant::now();
    let deadline = race
        .config
        .request_timeout
        .min(race.range.remaining(sent_at));

    let request = lease.claimant.claim(&race.username, proxy.as_deref());
    let raw = tokio::time::timeout(deadline, request)
        .await
        .unwrap_or(RawClaimResult::Timeout);

    let outcome = classify(&race.username, &raw);
    race.stats.increment(outcome);
    record_attempt(outcome, sent_at.elapsed());
    debug!(
        account = lease.claimant.id(),
        proxy = proxy.as_ref().map(|p| p.url.as_str()).unwrap_or("direct"),
        outcome = outcome.label(),
        latency_ms = sent_at.elapsed().as_millis() as u64,
        "attempt completed"
    );

    let release = match outcome {
        Outcome::Success => {
            let success = ClaimSuccess {
                username: race.username.clone(),
                account_id: lease.claimant.id().to_string(),
                kind: lease.claimant.kind(),
                proxy: proxy.as_ref().map(|p| p.to_string()),
                elapsed: race.started.elapsed(),
            };
            race.settle(Terminal::Claimed(success));
            Release::Idle
        }
        Outcome::Duplicate => {
            race.settle(Terminal::Lost(RaceError::AlreadyClaimed));
            Release::Idle
        }
        Outcome::NotAllowed => {
            race.settle(Terminal::Lost(RaceError::NameNotAllowed));
            Release::Idle
        }
        Outcome::RateLimited | Outcome::TransientError => {
            back_off(&race, lease.retries).await;
            Release::Retried
        }
        Outcome::FatalError => {
            warn!(
                account = lease.claimant.id(),
                kind = lease.claimant.kind().label(),
                "account rejected by service, retiring it"
            );
            Release::Exhausted
        }
    };
    race.pool.release(lease.index, release).await;
}

/// Sleep before a retry, cut short by window close or race settlement.
async fn back_off(race: &Race, retries: u32) {
    let remaining = race.range.remaining(Instant::now());
    if race.is_settled() || remaining.is_zero() {
        return;
    }
    let delay = race.config.backoff.delay(retries).min(remaining);
    let mut settled = race.signal.subscribe();
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = async { let _ = settled.wait_for(Option::is_some).await; } => {}
    }
}

/// Freeze the stats, then log and record how the race ended.
async fn finish(
    race: &Race,
    result: std::result::Result<ClaimSuccess, RaceError>,
) -> std::result::Result<ClaimSuccess, RaceError> {
    race.stats.finish(Instant::now());
    let snapshot = race.stats.snapshot();
    let accounts = race.pool.counts().await;
    match &result {
        Ok(success) => {
            record_race("claimed");
            info!(
                account = %success.account_id,
                kind = success.kind.label(),
                elapsed_ms = success.elapsed.as_millis() as u64,
                total = snapshot.total,
                exhausted_accounts = accounts.exhausted,
                "name claimed"
            );
        }
        Err(reason) => {
            record_race(reason.label());
            info!(
                reason = reason.label(),
                total = snapshot.total,
                duplicate = snapshot.duplicate,
                not_allowed = snapshot.not_allowed,
                too_many_requests = snapshot.too_many_requests,
                exhausted_accounts = accounts.exhausted,
                "race lost"
            );
        }
    }
    result
}
