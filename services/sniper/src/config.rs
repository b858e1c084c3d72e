//! Configuration types and loading
//!
//! Config precedence: CLI args > config file > defaults. The file itself is
//! found via `--config`, then the NAMESNIPE_CONFIG env var, then
//! `namesnipe.toml` in the working directory. Only the last one may be absent.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use claimant::AccountKind;
use serde::Deserialize;
use snipe_engine::{Backoff, DropRange, RaceConfig};

use crate::cli::Args;

pub const CONFIG_ENV: &str = "NAMESNIPE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "namesnipe.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub race: RaceSection,
    pub accounts: AccountsConfig,
    pub proxies: ProxiesConfig,
    pub drop: DropConfig,
    pub status: StatusConfig,
}

/// Per-attempt timing
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RaceSection {
    pub request_timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter_ms: u64,
    pub spin_threshold_ms: u64,
}

impl Default for RaceSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: 1500,
            backoff_base_ms: 50,
            backoff_max_ms: 1000,
            backoff_jitter_ms: 25,
            spin_threshold_ms: 20,
        }
    }
}

/// One token file per account kind
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    pub gift_code: PathBuf,
    pub game_pass: PathBuf,
    pub microsoft: PathBuf,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            gift_code: PathBuf::from("gc.txt"),
            game_pass: PathBuf::from("gp.txt"),
            microsoft: PathBuf::from("ms.txt"),
        }
    }
}

impl AccountsConfig {
    pub fn sources(&self) -> [(AccountKind, &Path); 3] {
        [
            (AccountKind::GiftCode, self.gift_code.as_path()),
            (AccountKind::GamePass, self.game_pass.as_path()),
            (AccountKind::Microsoft, self.microsoft.as_path()),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProxiesConfig {
    pub file: PathBuf,
}

impl Default for ProxiesConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("proxies.txt"),
        }
    }
}

/// Drop window. No start means the window opens immediately.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DropConfig {
    pub start_unix_ms: Option<u64>,
    pub window_ms: u64,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            start_unix_ms: None,
            window_ms: 2000,
        }
    }
}

/// Status reporting. No listen address means no HTTP endpoint.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    pub listen_addr: Option<SocketAddr>,
    pub interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            listen_addr: None,
            interval_ms: 1000,
        }
    }
}

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    /// Named by flag or env var, so it must exist.
    pub explicit: bool,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a resolved path, falling back to defaults when the implicit
    /// default file is absent.
    pub fn load_from(source: &ConfigPath) -> common::Result<Self> {
        if !source.path.exists() {
            if source.explicit {
                return Err(common::Error::MissingFile(source.path.clone()));
            }
            return Ok(Config::default());
        }
        Self::load(&source.path)
    }

    /// Resolve config file path from CLI arg or NAMESNIPE_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigPath {
        if let Some(p) = cli_path {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigPath {
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            explicit: false,
        }
    }

    /// Overlay command-line flags, then re-validate.
    pub fn apply_args(&mut self, args: &Args) -> common::Result<()> {
        if let Some(start) = args.start_unix_ms {
            self.drop.start_unix_ms = Some(start);
        }
        if let Some(window) = args.window_ms {
            self.drop.window_ms = window;
        }
        self.validate()
    }

    pub fn validate(&self) -> common::Result<()> {
        if self.race.request_timeout_ms == 0 {
            return Err(common::Error::Config(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.race.backoff_base_ms > self.race.backoff_max_ms {
            return Err(common::Error::Config(format!(
                "backoff_base_ms ({}) must not exceed backoff_max_ms ({})",
                self.race.backoff_base_ms, self.race.backoff_max_ms
            )));
        }
        if self.drop.window_ms == 0 {
            return Err(common::Error::Config(
                "window_ms must be greater than 0".into(),
            ));
        }
        if self.status.interval_ms == 0 {
            return Err(common::Error::Config(
                "interval_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn race_config(&self) -> RaceConfig {
        RaceConfig {
            request_timeout: self.request_timeout(),
            backoff: Backoff {
                base: Duration::from_millis(self.race.backoff_base_ms),
                max: Duration::from_millis(self.race.backoff_max_ms),
                jitter: Duration::from_millis(self.race.backoff_jitter_ms),
            },
            spin_threshold: Duration::from_millis(self.race.spin_threshold_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.race.request_timeout_ms)
    }

    /// Drop window as monotonic instants, sampled now.
    pub fn drop_range(&self) -> DropRange {
        let window = Duration::from_millis(self.drop.window_ms);
        match self.drop.start_unix_ms {
            Some(start) => DropRange::from_unix_millis(start, window),
            None => DropRange::starting_now(window),
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status.interval_ms)
    }
}
