// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `bridge_configuration.toml`.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub udp: UdpConfig,
    pub serial: SerialConfig,
    pub command: CommandConfig,
    pub dispatch: DispatchConfig,
    pub diagnostic: DiagnosticConfig,
    pub logging: LoggingConfig,
}

/// Command socket
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UdpConfig {
    pub host: String,
    pub port: u16,
    /// Bytes read per datagram; longer datagrams are truncated
    pub max_datagram_size: usize,
    /// How often the listener wakes to check for shutdown
    pub poll_interval_ms: u64,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.33".to_string(),
            port: 10333,
            max_datagram_size: 128,
            poll_interval_ms: 250,
        }
    }
}

impl UdpConfig {
    /// Parsed bind address, `None` if the host is not an IP literal
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        self.host
            .parse::<IpAddr>()
            .ok()
            .map(|ip| SocketAddr::new(ip, self.port))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Write timeout used when none is configured: the longest wait every
/// serial backend accepts (`u32::MAX` ms). Not `Duration::MAX`, which
/// overflows `Instant` arithmetic in the backend's flush.
pub const UNBOUNDED_WRITE_TIMEOUT: Duration = Duration::from_millis(u32::MAX as u64);

/// Serial devices. 8-N-1 framing is fixed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device the relay writes frames to
    pub write_port: String,
    /// Device the monitor reads frames from
    pub read_port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Bound on a single frame write (0 = block until the OS accepts it)
    pub write_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            write_port: "COM6".to_string(),
            read_port: "COM3".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            write_timeout_ms: 0,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// [`UNBOUNDED_WRITE_TIMEOUT`] when `write_timeout_ms` is 0
    pub fn write_timeout(&self) -> Duration {
        match self.write_timeout_ms {
            0 => UNBOUNDED_WRITE_TIMEOUT,
            ms => Duration::from_millis(ms),
        }
    }
}

/// Values applied to fields a datagram does not carry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandConfig {
    pub default_turn: u8,
    pub default_wind: u8,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            default_turn: 100,
            default_wind: 0,
        }
    }
}

/// Relay loop policy
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Stop the relay after this many failed writes in a row (0 = never)
    pub max_consecutive_write_failures: u32,
}

/// Monitor loop policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DiagnosticConfig {
    /// Stop the monitor after this many timeouts in a row (0 = retry forever)
    pub max_consecutive_timeouts: u32,
    pub reconnect_attempts: u32,
    pub reconnect_backoff_ms: u64,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        Self {
            max_consecutive_timeouts: 0,
            reconnect_attempts: 5,
            reconnect_backoff_ms: 500,
        }
    }
}

impl DiagnosticConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    /// Number of run folders kept when file logging is on
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_runs: 10,
        }
    }
}
