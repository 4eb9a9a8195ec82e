//! Server configuration: RON-persisted settings with CLI overrides.

pub mod cli;
pub mod config;
pub mod error;

pub use cli::CliArgs;
pub use config::{ApplyConfig, Config, DebugConfig, NetworkConfig, WorldsConfig};
pub use error::ConfigError;
