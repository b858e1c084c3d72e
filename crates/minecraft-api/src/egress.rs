//! One HTTP client per egress path
//!
//! `reqwest` binds proxies at client construction, so every configured proxy
//! gets its own `Client` (and connection pool) built once up front. Claim
//! requests then only do a map lookup, keeping connection setup off the
//! hot path where possible.

use std::collections::HashMap;
use std::time::Duration;

use claimant::Proxy;
use tracing::{debug, info};

use crate::constants::USER_AGENT;
use crate::error::{Error, Result};

/// Prebuilt clients for the direct path and every proxy.
pub struct Egress {
    direct: reqwest::Client,
    proxied: HashMap<String, reqwest::Client>,
}

impl Egress {
    /// Build clients for the direct path plus each proxy in `proxies`.
    ///
    /// `connect_timeout` bounds TCP/TLS/proxy handshakes; the overall request
    /// deadline is enforced by the race engine.
    pub fn new(proxies: &[Proxy], connect_timeout: Duration) -> Result<Self> {
        let direct = base_builder(connect_timeout)
            .no_proxy()
            .build()
            .map_err(|e| Error::Http(format!("building direct client: {e}")))?;

        let mut proxied = HashMap::with_capacity(proxies.len());
        for proxy in proxies {
            let mut upstream = reqwest::Proxy::all(&proxy.url).map_err(|e| Error::InvalidProxy {
                line: proxy.url.clone(),
                reason: e.to_string(),
            })?;
            if let Some(auth) = &proxy.auth {
                upstream = upstream.basic_auth(&auth.username, auth.password.expose());
            }
            let client = base_builder(connect_timeout)
                .proxy(upstream)
                .build()
                .map_err(|e| Error::Http(format!("building client for {proxy}: {e}")))?;
            debug!(proxy = %proxy, "egress client ready");
            proxied.insert(key(proxy), client);
        }

        info!(proxies = proxied.len(), "egress clients initialized");
        Ok(Self { direct, proxied })
    }

    /// Egress with only the direct path.
    pub fn direct_only(connect_timeout: Duration) -> Result<Self> {
        Self::new(&[], connect_timeout)
    }

    /// Client for `proxy`, or the direct client when `None`.
    ///
    /// Returns `None` for a proxy that was not registered at construction.
    pub fn client_for(&self, proxy: Option<&Proxy>) -> Option<&reqwest::Client> {
        match proxy {
            None => Some(&self.direct),
            Some(p) => self.proxied.get(&key(p)),
        }
    }

    /// Number of proxied paths (the direct path is not counted).
    pub fn proxy_count(&self) -> usize {
        self.proxied.len()
    }
}

fn base_builder(connect_timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(connect_timeout)
        .tcp_nodelay(true)
}

/// Identity of a proxy for lookup: URL plus auth user, never the password.
fn key(proxy: &Proxy) -> String {
    match &proxy.auth {
        Some(auth) => format!("{}#{}", proxy.url, auth.username),
        None => proxy.url.clone(),
    }
}
