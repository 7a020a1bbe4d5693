// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # actuator-bridge
//!
//! Relays whitespace-separated text commands received over UDP to an
//! actuator controller as fixed 8-byte serial frames, and renders frames read
//! back from a serial device for diagnostics.
//!
//! ## Crates
//!
//! - [`protocol`]: frame encoder, command validator, diagnostic formatting
//! - [`io`]: serial sink, UDP dispatch loop, diagnostic reader
//! - [`config`]: TOML configuration with environment and CLI overrides
//! - [`observability`]: logging setup and per-crate debug flags
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use actuator_bridge::config::load_config_or_default;
//! use actuator_bridge::io::{SerialPortSink, UdpListener};
//!
//! # fn main() -> anyhow::Result<()> {
//! let (config, _) = load_config_or_default(None)?;
//! let listener = UdpListener::bind(
//!     actuator_bridge::bind_addr(&config.udp)?,
//!     config.udp.poll_interval(),
//! )?;
//! let sink = SerialPortSink::open(&actuator_bridge::write_settings(&config.serial))?;
//!
//! let running = AtomicBool::new(true);
//! actuator_bridge::dispatch_loop(&config, listener, sink).run(&running)?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

use bridge_config::{
    BridgeConfig, CommandConfig, DiagnosticConfig, DispatchConfig, LoggingConfig, UdpConfig,
};
use bridge_io::{
    DatagramSource, DispatchLoop, ReadRetryPolicy, ReconnectPolicy, SerialSink,
    WriteFailurePolicy,
};
use bridge_observability::LoggingOptions;
use bridge_protocol::CommandDefaults;

pub use bridge_config as config;
pub use bridge_io as io;
pub use bridge_observability as observability;
pub use bridge_protocol as protocol;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The bind host is not an IP literal
#[derive(Debug, thiserror::Error)]
#[error("UDP host '{host}' is not an IP address")]
pub struct InvalidBindAddress {
    pub host: String,
}

/// Socket address the relay listens on
pub fn bind_addr(udp: &UdpConfig) -> Result<SocketAddr, InvalidBindAddress> {
    udp.bind_addr().ok_or_else(|| InvalidBindAddress {
        host: udp.host.clone(),
    })
}

pub fn command_defaults(command: &CommandConfig) -> CommandDefaults {
    CommandDefaults {
        turn: command.default_turn,
        wind: command.default_wind,
    }
}

/// A limit of 0 means never escalate
pub fn write_failure_policy(dispatch: &DispatchConfig) -> WriteFailurePolicy {
    match dispatch.max_consecutive_write_failures {
        0 => WriteFailurePolicy::never_escalate(),
        n => WriteFailurePolicy::escalate_after(n),
    }
}

/// A limit of 0 means retry timeouts forever
pub fn read_retry_policy(diagnostic: &DiagnosticConfig) -> ReadRetryPolicy {
    ReadRetryPolicy {
        max_consecutive_timeouts: match diagnostic.max_consecutive_timeouts {
            0 => None,
            n => Some(n),
        },
    }
}

pub fn reconnect_policy(diagnostic: &DiagnosticConfig) -> ReconnectPolicy {
    ReconnectPolicy {
        max_attempts: diagnostic.reconnect_attempts,
        backoff: diagnostic.reconnect_backoff(),
    }
}

pub fn logging_options(logging: &LoggingConfig) -> LoggingOptions {
    LoggingOptions {
        level: logging.level.clone(),
        file_logging: logging.file_logging,
        log_dir: logging.log_dir.clone(),
        retention_runs: logging.retention_runs,
    }
}

/// Dispatch loop configured from `config`, owning `source` and `sink`
pub fn dispatch_loop<D, S>(config: &BridgeConfig, source: D, sink: S) -> DispatchLoop<D, S>
where
    D: DatagramSource,
    S: SerialSink,
{
    DispatchLoop::new(source, sink)
        .with_defaults(command_defaults(&config.command))
        .with_max_datagram_size(config.udp.max_datagram_size)
        .with_write_failure_policy(write_failure_policy(&config.dispatch))
}

#[cfg(feature = "serial-transport")]
mod serial_settings {
    use bridge_config::SerialConfig;
    use bridge_io::SerialSettings;

    /// Settings for the device the relay writes to. Writes block up to
    /// `write_timeout`, which is unbounded unless configured.
    pub fn write_settings(serial: &SerialConfig) -> SerialSettings {
        SerialSettings::new(&serial.write_port, serial.baud_rate, serial.write_timeout())
    }

    /// Settings for the device the monitor reads from
    pub fn read_settings(serial: &SerialConfig) -> SerialSettings {
        SerialSettings::new(&serial.read_port, serial.baud_rate, serial.read_timeout())
    }
}

#[cfg(feature = "serial-transport")]
pub use serial_settings::{read_settings, write_settings};

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_limits_disable_escalation() {
        let config = BridgeConfig::default();
        assert_eq!(
            write_failure_policy(&config.dispatch),
            WriteFailurePolicy::never_escalate()
        );
        assert_eq!(read_retry_policy(&config.diagnostic).max_consecutive_timeouts, None);
    }

    #[test]
    fn test_limits_carry_over() {
        let dispatch = DispatchConfig {
            max_consecutive_write_failures: 3,
        };
        assert_eq!(write_failure_policy(&dispatch), WriteFailurePolicy::escalate_after(3));

        let diagnostic = DiagnosticConfig {
            max_consecutive_timeouts: 4,
            reconnect_attempts: 2,
            reconnect_backoff_ms: 50,
        };
        assert_eq!(read_retry_policy(&diagnostic).max_consecutive_timeouts, Some(4));
        assert_eq!(
            reconnect_policy(&diagnostic),
            ReconnectPolicy {
                max_attempts: 2,
                backoff: Duration::from_millis(50),
            }
        );
    }

    #[cfg(feature = "serial-transport")]
    #[test]
    fn test_relay_writes_ignore_read_timeout() {
        use bridge_config::{SerialConfig, UNBOUNDED_WRITE_TIMEOUT};

        let serial = SerialConfig {
            read_timeout_ms: 250,
            ..SerialConfig::default()
        };
        let write = write_settings(&serial);
        assert_eq!(write.port, "COM6");
        assert_eq!(write.timeout, UNBOUNDED_WRITE_TIMEOUT);

        let read = read_settings(&serial);
        assert_eq!(read.port, "COM3");
        assert_eq!(read.timeout, Duration::from_millis(250));

        let bounded = SerialConfig {
            write_timeout_ms: 2000,
            ..serial
        };
        assert_eq!(write_settings(&bounded).timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_bind_addr_rejects_hostnames() {
        let udp = UdpConfig {
            host: "bridge.local".to_string(),
            ..UdpConfig::default()
        };
        assert!(bind_addr(&udp).is_err());
        assert_eq!(
            bind_addr(&UdpConfig::default()).unwrap(),
            "127.0.0.33:10333".parse::<SocketAddr>().unwrap()
        );
    }
}
