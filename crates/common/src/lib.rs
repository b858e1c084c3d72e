//! Types shared by every namesnipe crate

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
