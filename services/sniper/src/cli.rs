//! Command-line arguments
//!
//! Flags override the matching config file values:
//!
//! ```text
//! namesnipe [--config <path>] [-u|--username <name>] [--start <unix-ms>]
//!           [--window-ms <ms>] [--disable-bar]
//! ```

use crate::error::{Error, Result};

pub const USAGE: &str = "\
usage: namesnipe [options]

  --config <path>        config file (default: $NAMESNIPE_CONFIG or namesnipe.toml)
  -u, --username <name>  name to claim (prompted for when omitted)
  --start <unix-ms>      drop time as a unix timestamp in milliseconds
  --window-ms <ms>       how long after the drop to keep trying
  --disable-bar          do not log periodic race status
  -h, --help             print this help";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<String>,
    pub username: Option<String>,
    pub start_unix_ms: Option<u64>,
    pub window_ms: Option<u64>,
    pub disable_bar: bool,
    pub help: bool,
}

impl Args {
    /// Parse arguments, excluding the program name.
    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => parsed.config = Some(value(&arg, args.next())?),
                "-u" | "--username" => parsed.username = Some(value(&arg, args.next())?),
                "--start" => parsed.start_unix_ms = Some(number(&arg, args.next())?),
                "--window-ms" => parsed.window_ms = Some(number(&arg, args.next())?),
                "--disable-bar" => parsed.disable_bar = true,
                "-h" | "--help" => parsed.help = true,
                other => return Err(Error::Usage(format!("unknown argument {other}"))),
            }
        }

        Ok(parsed)
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String> {
    next.filter(|v| !v.starts_with("--"))
        .ok_or_else(|| Error::Usage(format!("{flag} requires a value")))
}

fn number(flag: &str, next: Option<String>) -> Result<u64> {
    let raw = value(flag, next)?;
    raw.parse()
        .map_err(|_| Error::Usage(format!("{flag} expects a whole number, got {raw}")))
}
