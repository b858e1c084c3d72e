//! Egress path descriptors

use common::Secret;
use std::fmt;

/// Credentials for an authenticating proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: Secret<String>,
}

/// An outbound network path a claim request can be routed through.
///
/// `url` always carries a scheme (`http://host:port`, `socks5://host:port`).
/// Stateless: the same proxy is reused across accounts and attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proxy {
    pub url: String,
    pub auth: Option<ProxyAuth>,
}

impl Proxy {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
        }
    }

    pub fn with_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(ProxyAuth {
            username: username.into(),
            password: Secret::new(password.into()),
        });
        self
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.auth {
            Some(auth) => write!(f, "{} (as {})", self.url, auth.username),
            None => f.write_str(&self.url),
        }
    }
}
