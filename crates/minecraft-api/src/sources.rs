//! Plain-text account and proxy lists
//!
//! Account files hold one bearer token per line, one file per account kind.
//! Proxy files hold one proxy per line as `host:port`, `host:port:user:pass`
//! or a URL with scheme. Blank lines and `#` comments are ignored in both.
//!
//! Bad lines never abort a load: they are returned next to the good entries
//! so the caller can log them and race with whatever parsed.

use std::path::Path;
use std::sync::Arc;

use claimant::{AccountKind, Claimant, Proxy};
use common::Secret;
use tracing::{debug, info};

use crate::accounts::{Api, build_account};
use crate::error::{Error, Result};

/// Parse account lines of one kind. `origin` names the source in ids and errors.
pub fn parse_accounts(
    contents: &str,
    kind: AccountKind,
    origin: &str,
    api: &Api,
) -> (Vec<Arc<dyn Claimant>>, Vec<Error>) {
    let mut accounts = Vec::new();
    let mut errors = Vec::new();

    for (line_no, line) in significant_lines(contents) {
        match validate_token(line) {
            Ok(()) => {
                let id = format!("{}:{line_no}", origin);
                accounts.push(build_account(kind, id, Secret::from(line), api.clone()));
            }
            Err(reason) => errors.push(Error::InvalidAccount {
                origin: origin.to_string(),
                line_no,
                reason,
            }),
        }
    }

    debug!(origin, kind = %kind, accounts = accounts.len(), errors = errors.len(), "parsed accounts");
    (accounts, errors)
}

/// Read and parse an account file. A missing file yields no accounts.
pub async fn load_accounts(
    path: &Path,
    kind: AccountKind,
    api: &Api,
) -> Result<(Vec<Arc<dyn Claimant>>, Vec<Error>)> {
    let Some(contents) = read_optional(path).await? else {
        info!(path = %path.display(), kind = %kind, "account file not found, skipping");
        return Ok((Vec::new(), Vec::new()));
    };
    let origin = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(parse_accounts(&contents, kind, &origin, api))
}

/// Parse proxy lines.
pub fn parse_proxies(contents: &str) -> (Vec<Proxy>, Vec<Error>) {
    let mut proxies = Vec::new();
    let mut errors = Vec::new();
    for (_, line) in significant_lines(contents) {
        match parse_proxy_line(line) {
            Ok(proxy) => proxies.push(proxy),
            Err(e) => errors.push(e),
        }
    }
    (proxies, errors)
}

/// Read and parse a proxy file. `Ok(None)` means the file does not exist.
pub async fn load_proxies(path: &Path) -> Result<Option<(Vec<Proxy>, Vec<Error>)>> {
    Ok(read_optional(path)
        .await?
        .map(|contents| parse_proxies(&contents)))
}

/// URL schemes the egress clients can dial through.
const PROXY_SCHEMES: &[&str] = &["http", "https", "socks5", "socks5h"];

fn parse_proxy_line(line: &str) -> Result<Proxy> {
    let invalid = |reason: &str| Error::InvalidProxy {
        line: redact_proxy_line(line),
        reason: reason.to_string(),
    };

    if line.contains("://") {
        let url = reqwest::Url::parse(line).map_err(|_| invalid("malformed proxy URL"))?;
        if !PROXY_SCHEMES.contains(&url.scheme()) {
            return Err(invalid("proxy scheme must be http, https, socks5 or socks5h"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("empty host"));
        }
        return Ok(Proxy::new(line));
    }

    let parts: Vec<&str> = line.split(':').collect();
    let (host, port) = match parts.as_slice() {
        [host, port] | [host, port, _, _] => (*host, *port),
        _ => return Err(invalid("expected host:port or host:port:user:pass")),
    };
    if host.is_empty() {
        return Err(invalid("empty host"));
    }
    port.parse::<u16>()
        .map_err(|_| invalid("port must be a number between 0 and 65535"))?;

    let proxy = Proxy::new(format!("http://{host}:{port}"));
    match parts.as_slice() {
        [_, _, user, pass] => Ok(proxy.with_auth(*user, *pass)),
        _ => Ok(proxy),
    }
}

/// Bearer tokens are opaque but never contain whitespace or colons; a colon
/// almost always means an `email:password` login, which is not accepted here.
fn validate_token(line: &str) -> std::result::Result<(), String> {
    if line.contains(':') {
        return Err("expected a bearer token, found a login pair".into());
    }
    if line.chars().any(char::is_whitespace) {
        return Err("bearer token must not contain whitespace".into());
    }
    Ok(())
}

/// Keep `host:port` for error messages, drop anything after it.
fn redact_proxy_line(line: &str) -> String {
    line.splitn(3, ':').take(2).collect::<Vec<_>>().join(":")
}

/// Trimmed non-empty, non-comment lines with 1-based line numbers.
fn significant_lines(contents: &str) -> impl Iterator<Item = (usize, &str)> {
    contents
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(format!("reading {}: {e}", path.display()))),
    }
}
