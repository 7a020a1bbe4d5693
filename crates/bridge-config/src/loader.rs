// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{BridgeConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "bridge_configuration.toml";

/// Find the bridge configuration file
///
/// Search order:
/// 1. `BRIDGE_CONFIG_PATH` environment variable
/// 2. Current working directory: `./bridge_configuration.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("BRIDGE_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by BRIDGE_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        search_paths.extend(
            cwd.ancestors()
                .skip(1)
                .take(5)
                .map(|dir| dir.join(CONFIG_FILE_NAME)),
        );
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet BRIDGE_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BridgeConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: BridgeConfig = toml::from_str(&content)?;

    apply_overrides(&mut config, cli_args);
    Ok(config)
}

/// Load the discovered config file, or fall back to built-in defaults when
/// none exists. Overrides are applied either way.
///
/// Returns the configuration and the file it came from, if any.
///
/// # Errors
///
/// A file that exists but cannot be read or parsed is still an error
pub fn load_config_or_default(
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<(BridgeConfig, Option<PathBuf>)> {
    match find_config_file() {
        Ok(path) => {
            let config = load_config(Some(&path), cli_args)?;
            Ok((config, Some(path)))
        }
        Err(ConfigError::FileNotFound(_)) if env::var_os("BRIDGE_CONFIG_PATH").is_none() => {
            let mut config = BridgeConfig::default();
            apply_overrides(&mut config, cli_args);
            Ok((config, None))
        }
        Err(e) => Err(e),
    }
}

fn apply_overrides(config: &mut BridgeConfig, cli_args: Option<&HashMap<String, String>>) {
    apply_environment_overrides(config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(config, cli);
    }
}

fn set_parsed<T: FromStr>(target: &mut T, value: &str) {
    if let Ok(parsed) = value.trim().parse::<T>() {
        *target = parsed;
    }
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `BRIDGE_UDP_HOST` -> `udp.host`
/// - `BRIDGE_UDP_PORT` -> `udp.port`
/// - `BRIDGE_SERIAL_WRITE_PORT` -> `serial.write_port`
/// - `BRIDGE_SERIAL_READ_PORT` -> `serial.read_port`
/// - `BRIDGE_SERIAL_BAUD_RATE` -> `serial.baud_rate`
/// - `BRIDGE_LOG_LEVEL` -> `logging.level`
///
/// Values that do not parse are ignored.
pub fn apply_environment_overrides(config: &mut BridgeConfig) {
    if let Ok(value) = env::var("BRIDGE_UDP_HOST") {
        config.udp.host = value;
    }
    if let Ok(value) = env::var("BRIDGE_UDP_PORT") {
        set_parsed(&mut config.udp.port, &value);
    }
    if let Ok(value) = env::var("BRIDGE_SERIAL_WRITE_PORT") {
        config.serial.write_port = value;
    }
    if let Ok(value) = env::var("BRIDGE_SERIAL_READ_PORT") {
        config.serial.read_port = value;
    }
    if let Ok(value) = env::var("BRIDGE_SERIAL_BAUD_RATE") {
        set_parsed(&mut config.serial.baud_rate, &value);
    }
    if let Ok(value) = env::var("BRIDGE_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"udp_port": "9000", "serial_port": "COM4"}`)
pub fn apply_cli_overrides(config: &mut BridgeConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("udp_host") {
        config.udp.host = value.clone();
    }
    if let Some(value) = cli_args.get("udp_port") {
        set_parsed(&mut config.udp.port, value);
    }
    if let Some(value) = cli_args.get("serial_port") {
        config.serial.write_port = value.clone();
    }
    if let Some(value) = cli_args.get("read_port") {
        config.serial.read_port = value.clone();
    }
    if let Some(value) = cli_args.get("baud_rate") {
        set_parsed(&mut config.serial.baud_rate, value);
    }
    if let Some(value) = cli_args.get("read_timeout_ms") {
        set_parsed(&mut config.serial.read_timeout_ms, value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
