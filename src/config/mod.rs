//! Configuration loading and validation.
//!
//! TOML file at `<config dir>/skybridge/config.toml`; a missing file yields
//! the built-in defaults. Validation failures are user-visible startup
//! errors, never silently patched.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{
    BrokerConfig, Config, IngestConfig, LocationConfig, TopicConfig, WeatherConfig,
};
