//! # Configuration Modules
//!
//! Layered configuration for the room subscriber service.

/// Defaults, JSON file, environment and CLI layering into validated `RelaySettings`.
pub mod config_relay;

pub use config_relay::{load_config, resolve, ConfigError, RelayConfig, RelaySettings};
