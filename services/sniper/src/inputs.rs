//! Account and proxy files
//!
//! Bad lines and unreadable files are logged and skipped. Only an empty
//! account set is fatal.

use std::path::Path;
use std::sync::Arc;

use claimant::{Claimant, Proxy};
use minecraft_api::Api;
use tracing::{info, warn};

use crate::config::AccountsConfig;
use crate::error::{Error, Result};

/// Load every configured account file.
pub async fn load_accounts(config: &AccountsConfig, api: &Api) -> Result<Vec<Arc<dyn Claimant>>> {
    let mut accounts = Vec::new();

    for (kind, path) in config.sources() {
        match minecraft_api::load_accounts(path, kind, api).await {
            Ok((loaded, errors)) => {
                for e in &errors {
                    warn!(path = %path.display(), kind = %kind, error = %e, "skipping account line");
                }
                if !loaded.is_empty() {
                    info!(path = %path.display(), kind = %kind, accounts = loaded.len(), "accounts loaded");
                }
                accounts.extend(loaded);
            }
            Err(e) => {
                warn!(path = %path.display(), kind = %kind, error = %e, "failed to read account file");
            }
        }
    }

    if accounts.is_empty() {
        return Err(Error::NoAccounts);
    }
    Ok(accounts)
}

/// Load the proxy list. A missing or unreadable file means the direct path.
pub async fn load_proxies(path: &Path) -> Vec<Proxy> {
    match minecraft_api::load_proxies(path).await {
        Ok(Some((proxies, errors))) => {
            for e in &errors {
                warn!(path = %path.display(), error = %e, "skipping proxy line");
            }
            info!(path = %path.display(), proxies = proxies.len(), "proxies loaded");
            proxies
        }
        Ok(None) => {
            warn!(path = %path.display(), "proxy file not found, using direct connection");
            Vec::new()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read proxy file, using direct connection");
            Vec::new()
        }
    }
}
