//! Round-robin proxy rotation

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use claimant::Proxy;

/// Hands out proxies in a fixed cycle, independent of which account asks.
///
/// One shared atomic cursor: concurrent callers each get a distinct step of
/// the cycle, though which caller gets which step is up to the scheduler.
pub struct ProxyRouter {
    proxies: Vec<Arc<Proxy>>,
    cursor: AtomicUsize,
}

impl ProxyRouter {
    pub fn new(proxies: Vec<Proxy>) -> Self {
        Self {
            proxies: proxies.into_iter().map(Arc::new).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Next proxy in the cycle, or `None` for the direct path when no
    /// proxies are configured.
    pub fn next(&self) -> Option<Arc<Proxy>> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(Arc::clone(&self.proxies[idx]))
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }
}
