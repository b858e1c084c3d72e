//! namesnipe
//!
//! Single-binary name sniper that:
//! 1. Loads account tokens and proxies from plain-text files
//! 2. Waits for the drop window of the target name to open
//! 3. Races every account for the name until one claims it or the race ends
//! 4. Logs live race status and optionally serves it over HTTP

mod cli;
mod config;
mod error;
mod inputs;
mod metrics;
mod status;

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use minecraft_api::{Api, Egress};
use snipe_engine::{ClaimOrchestrator, ClaimSuccess, spawn_stats_observer};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Args, USAGE};
use crate::config::Config;
use crate::status::StatusState;

const EXIT_RACE_LOST: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    if args.help {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %format!("{e:#}"), "startup failed");
            ExitCode::from(EXIT_CONFIG)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    info!("starting namesnipe");

    let config_source = Config::resolve_path(args.config.as_deref());
    info!(path = %config_source.path.display(), "loading configuration");
    let mut config = Config::load_from(&config_source).with_context(|| {
        format!(
            "failed to load config from {}",
            config_source.path.display()
        )
    })?;
    config
        .apply_args(&args)
        .context("invalid command-line override")?;

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder();

    let proxies = inputs::load_proxies(&config.proxies.file).await;
    let egress = Egress::new(&proxies, config.request_timeout())
        .context("failed to build HTTP clients")?;
    let egress_paths = egress.proxy_count();
    let api = Api::production(Arc::new(egress));

    let accounts = inputs::load_accounts(&config.accounts, &api).await?;

    let username = match args.username.clone() {
        Some(name) => name,
        None => prompt_username().await?,
    };
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(error::Error::MissingUsername.into());
    }

    info!(
        username = %username,
        accounts = accounts.len(),
        proxies = proxies.len(),
        proxy_clients = egress_paths,
        start_unix_ms = ?config.drop.start_unix_ms,
        window_ms = config.drop.window_ms,
        "configuration loaded"
    );

    let orchestrator = ClaimOrchestrator::new(config.race_config());

    let observer = (!args.disable_bar)
        .then(|| spawn_stats_observer(orchestrator.stats(), config.status_interval()));

    let status_server = match config.status.listen_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind status endpoint to {addr}"))?;
            let app = status::build_router(
                StatusState {
                    stats: orchestrator.stats(),
                    prometheus: prometheus_handle,
                    started_at: Instant::now(),
                },
                status::MAX_CONNECTIONS,
            );
            info!(addr = %addr, "status endpoint listening");
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    error!(error = %e, "status endpoint failed");
                }
            }))
        }
        None => None,
    };

    let range = config.drop_range();
    let outcome = tokio::select! {
        result = orchestrator.claim_within_range(&username, range, accounts, proxies) => Some(result),
        _ = shutdown_signal() => None,
    };

    if let Some(handle) = observer {
        handle.abort();
    }
    if let Some(handle) = status_server {
        handle.abort();
    }

    let code = match outcome {
        Some(result) => {
            report(&result);
            exit_code(&result)
        }
        None => {
            warn!("race interrupted before it settled");
            EXIT_INTERRUPTED
        }
    };
    info!(exit_code = code, "shutdown complete");
    Ok(ExitCode::from(code))
}

/// Ask for the target name on stdin.
async fn prompt_username() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        read_username(stdin.lock(), stdout.lock())
    })
    .await
    .context("username prompt task failed")?
    .context("failed to read username from stdin")
}

fn read_username(mut input: impl BufRead, mut output: impl Write) -> std::io::Result<String> {
    write!(output, "target username: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn report(result: &snipe_engine::Result<ClaimSuccess>) {
    match result {
        Ok(success) => info!(
            username = %success.username,
            account = %success.account_id,
            kind = success.kind.label(),
            proxy = success.proxy.as_deref().unwrap_or("direct"),
            elapsed_ms = success.elapsed.as_millis() as u64,
            "claimed name"
        ),
        Err(snipe_engine::Error::Race(reason)) => {
            warn!(reason = reason.label(), error = %reason, "failed to claim name")
        }
        Err(e) => error!(error = %e, "race did not start"),
    }
}

fn exit_code(result: &snipe_engine::Result<ClaimSuccess>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(snipe_engine::Error::Race(_)) => EXIT_RACE_LOST,
        Err(snipe_engine::Error::Config(_)) => EXIT_CONFIG,
    }
}

/// Wait for SIGTERM or SIGINT.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimant::AccountKind;
    use snipe_engine::RaceError;
    use std::time::Duration;

    #[test]
    fn exit_codes_follow_race_result() {
        let success = ClaimSuccess {
            username: "target".into(),
            account_id: "ms.txt:1".into(),
            kind: AccountKind::Microsoft,
            proxy: None,
            elapsed: Duration::from_millis(300),
        };
        assert_eq!(exit_code(&Ok(success)), 0);

        for reason in [
            RaceError::AlreadyClaimed,
            RaceError::NameNotAllowed,
            RaceError::WindowExpired,
            RaceError::NoUsableAccounts,
        ] {
            assert_eq!(exit_code(&Err(reason.into())), EXIT_RACE_LOST);
        }

        assert_eq!(
            exit_code(&Err(snipe_engine::Error::Config("no accounts".into()))),
            EXIT_CONFIG
        );
    }

    #[test]
    fn username_prompt_trims_input() {
        let mut output = Vec::new();
        let name = read_username("  Notch \n".as_bytes(), &mut output).unwrap();
        assert_eq!(name, "Notch");
        assert_eq!(String::from_utf8(output).unwrap(), "target username: ");
    }

    #[test]
    fn username_prompt_on_closed_stdin_is_empty() {
        let name = read_username("".as_bytes(), Vec::new()).unwrap();
        assert!(name.is_empty());
    }

    #[tokio::test]
    async fn missing_explicit_config_fails_before_any_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            config: Some(dir.path().join("absent.toml").display().to_string()),
            username: Some("target".into()),
            ..Args::default()
        };
        let err = run(args).await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config"));
    }

    #[tokio::test]
    async fn no_account_files_fails_with_no_accounts() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("namesnipe.toml");
        std::fs::write(
            &config_path,
            format!(
                r#"
[accounts]
gift_code = "{0}/gc.txt"
game_pass = "{0}/gp.txt"
microsoft = "{0}/ms.txt"

[proxies]
file = "{0}/proxies.txt"
"#,
                dir.path().display()
            ),
        )
        .unwrap();

        let args = Args {
            config: Some(config_path.display().to_string()),
            username: Some("target".into()),
            disable_bar: true,
            ..Args::default()
        };
        let err = run(args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<error::Error>(),
            Some(error::Error::NoAccounts)
        ));
    }
}
