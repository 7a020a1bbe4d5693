// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Bridge Configuration System
//!
//! Type-safe configuration loader for the actuator bridge with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_config::{load_config_or_default, validate_config};
//!
//! let (config, _source) = load_config_or_default(None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! println!("UDP: {}:{}", config.udp.host, config.udp.port);
//! println!("Serial: {} @ {}", config.serial.write_port, config.serial.baud_rate);
//! ```

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    load_config_or_default, CONFIG_FILE_NAME,
};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.udp.host, "127.0.0.33");
        assert_eq!(config.udp.port, 10333);
        assert_eq!(config.udp.max_datagram_size, 128);
        assert_eq!(config.serial.write_port, "COM6");
        assert_eq!(config.serial.read_port, "COM3");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout_ms, 1000);
        assert_eq!(config.serial.write_timeout_ms, 0);
        assert_eq!(config.command.default_turn, 100);
        assert_eq!(config.command.default_wind, 0);
    }
}
