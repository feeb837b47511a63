pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::google_maps::{ApiKey, GoogleMapsClient};
pub use adapters::storage::LocalStorage;
pub use core::{engine::MappingEngine, pipeline::VenuePipeline};
pub use utils::error::{MapperError, Result};
