#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

/// Google Places caps nearby searches at 50 km.
pub const MAX_PARKING_RADIUS_METERS: u32 = 50_000;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
