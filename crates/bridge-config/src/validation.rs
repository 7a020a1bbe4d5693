// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module checks that configuration values are usable before any
//! socket or serial device is opened.

use crate::{BridgeConfig, ConfigError, ConfigResult};
use std::net::IpAddr;

/// Largest payload a UDP datagram over IPv4 can carry
const MAX_UDP_PAYLOAD: usize = 65_507;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Required fields (UDP host, serial ports)
/// - A parsable bind address
/// - Valid value ranges (sizes, rates and intervals)
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &BridgeConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    let required = [
        ("udp.host", &config.udp.host),
        ("serial.write_port", &config.serial.write_port),
        ("serial.read_port", &config.serial.read_port),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigValidationError {
    ConfigValidationError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_value_ranges(config: &BridgeConfig, errors: &mut Vec<ConfigValidationError>) {
    if !config.udp.host.trim().is_empty() && config.udp.host.parse::<IpAddr>().is_err() {
        errors.push(invalid("udp.host", "must be an IPv4 or IPv6 address"));
    }
    if config.udp.port == 0 {
        errors.push(invalid("udp.port", "must be non-zero"));
    }
    if config.udp.max_datagram_size == 0 || config.udp.max_datagram_size > MAX_UDP_PAYLOAD {
        errors.push(invalid(
            "udp.max_datagram_size",
            "must be between 1 and 65507",
        ));
    }
    if config.udp.poll_interval_ms == 0 {
        errors.push(invalid("udp.poll_interval_ms", "must be positive"));
    }
    if config.serial.baud_rate == 0 {
        errors.push(invalid("serial.baud_rate", "must be positive"));
    }
    if config.serial.read_timeout_ms == 0 {
        errors.push(invalid("serial.read_timeout_ms", "must be positive"));
    }
    if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(invalid(
            "logging.level",
            "must be one of trace, debug, info, warn, error",
        ));
    }
}
