//! Timed multi-account claim racing
//!
//! Waits for a name's drop window to open, then fires concurrent claim
//! attempts across a pool of accounts and proxies until one of them settles
//! the race. Statistics are live for the duration of the race and can be read
//! from any task while it runs.
//!
//! Race lifecycle:
//! 1. `wait_until` sleeps until shortly before the window opens, then busy-polls
//! 2. Every Idle account is checked out and dispatched with the next proxy in rotation
//! 3. Each raw result is classified; Success/Duplicate/NotAllowed settle the race
//! 4. RateLimited/TransientError put the account back to Idle after a backoff
//! 5. FatalError retires the account for the rest of the race
//! 6. The race ends on settlement, window close, or when no usable account remains

pub mod backoff;
pub mod classify;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod pool;
pub mod router;
pub mod schedule;
pub mod stats;

pub use backoff::Backoff;
pub use classify::{classify, classify_response};
pub use error::{Error, RaceError, Result};
pub use observer::spawn_stats_observer;
pub use orchestrator::{ClaimOrchestrator, ClaimSuccess, RaceConfig};
pub use pool::{AccountPool, Lease, PoolCounts, Release, UsageState};
pub use router::ProxyRouter;
pub use schedule::{DropRange, wait_until};
pub use stats::{Stats, StatsSnapshot};
