//! Minecraft services API constants

/// Production API base URL. Tests point `Api` at a local server instead.
pub const API_BASE_URL: &str = "https://api.minecraftservices.com";

/// Profile creation endpoint for accounts that do not own a profile yet.
pub const CREATE_PROFILE_PATH: &str = "/minecraft/profile";

/// Rename endpoint prefix; the target name is appended as the last segment.
pub const CHANGE_NAME_PATH: &str = "/minecraft/profile/name";

/// User-Agent sent with every claim request.
pub const USER_AGENT: &str = concat!("namesnipe/", env!("CARGO_PKG_VERSION"));
