//! Minecraft services API accounts
//!
//! Concrete `Claimant` implementations for the three account kinds, the
//! per-proxy HTTP clients they send through, and the plain-text account and
//! proxy list formats the CLI reads. Tokens arrive already minted; this crate
//! never logs in on anyone's behalf.
//!
//! Request flow for one attempt:
//! 1. Engine picks an account and a proxy
//! 2. `Claimant::claim` looks up the `reqwest::Client` for that proxy in `Egress`
//! 3. GiftCode/GamePass accounts POST a new profile, Microsoft accounts PUT a rename
//! 4. Status and body come back unclassified as `RawClaimResult`

pub mod accounts;
pub mod constants;
pub mod egress;
pub mod error;
pub mod sources;

pub use accounts::{Api, GamePassAccount, GiftCodeAccount, MicrosoftAccount, build_account};
pub use constants::*;
pub use egress::Egress;
pub use error::{Error, Result};
pub use sources::{load_accounts, load_proxies, parse_accounts, parse_proxies};
