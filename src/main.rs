// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use actuator_bridge::config::{load_config, load_config_or_default, validate_config, BridgeConfig};
use actuator_bridge::io::{
    DiagnosticReader, SerialPortConnector, SerialPortSink, SerialSink, UdpListener,
};
use actuator_bridge::observability::{init_logging, CrateDebugFlags, LoggingGuard};

/// Actuator bridge - relays UDP commands to a serial actuator controller
#[derive(Parser, Debug)]
#[command(name = "actuator-bridge", version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: search for bridge_configuration.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable debug logging for one crate (repeatable)
    #[arg(long = "debug", value_name = "CRATE", global = true)]
    debug: Vec<String>,

    /// Enable debug logging for every crate
    #[arg(long, global = true, default_value_t = false)]
    debug_all: bool,

    /// Write JSON run logs under this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Listen for UDP commands and write control frames to the serial device
    Relay(RelayArgs),
    /// Read frames from a serial device and log them
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct RelayArgs {
    /// Address to bind (IP literal)
    #[arg(long)]
    udp_host: Option<String>,

    #[arg(long)]
    udp_port: Option<u16>,

    /// Serial device frames are written to (e.g. COM6, /dev/ttyUSB0)
    #[arg(long)]
    serial_port: Option<String>,

    #[arg(long)]
    baud_rate: Option<u32>,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Serial device frames are read from (e.g. COM3, /dev/ttyUSB1)
    #[arg(long)]
    serial_port: Option<String>,

    #[arg(long)]
    baud_rate: Option<u32>,

    #[arg(long)]
    read_timeout_ms: Option<u64>,
}

impl Cli {
    /// Command-line values in the form the config loader expects
    fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };

        put("log_level", self.log_level.clone());
        match &self.command {
            Command::Relay(args) => {
                put("udp_host", args.udp_host.clone());
                put("udp_port", args.udp_port.map(|p| p.to_string()));
                put("serial_port", args.serial_port.clone());
                put("baud_rate", args.baud_rate.map(|b| b.to_string()));
            }
            Command::Monitor(args) => {
                // the monitor reads, so --serial-port names the read side
                put("read_port", args.serial_port.clone());
                put("baud_rate", args.baud_rate.map(|b| b.to_string()));
                put("read_timeout_ms", args.read_timeout_ms.map(|t| t.to_string()));
            }
        }
        overrides
    }

    fn debug_flags(&self) -> Result<CrateDebugFlags> {
        let mut flags = CrateDebugFlags::default();
        for crate_name in &self.debug {
            flags.enable(crate_name)?;
        }
        if self.debug_all {
            flags.enable_all();
        }
        flags.merge_env().context("Invalid BRIDGE_DEBUG")?;
        Ok(flags)
    }
}

fn load(cli: &Cli) -> Result<BridgeConfig> {
    let overrides = cli.config_overrides();

    let mut config = match &cli.config {
        Some(path) => load_config(Some(path.as_path()), Some(&overrides))
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let (config, _source) =
                load_config_or_default(Some(&overrides)).context("Failed to load configuration")?;
            config
        }
    };

    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = dir.clone();
        config.logging.file_logging = true;
    }

    validate_config(&config)?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load(&cli)?;
    let debug_flags = cli.debug_flags()?;
    let logging: LoggingGuard = init_logging(
        &debug_flags,
        &actuator_bridge::logging_options(&config.logging),
    )?;

    if let Some(dir) = logging.log_dir() {
        info!("Writing logs to {}", dir.display());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    // a fatal error is printed once, by the anyhow return from main
    match cli.command {
        Command::Relay(_) => relay(&config, &running),
        Command::Monitor(_) => monitor(&config, &running),
    }
}

fn relay(config: &BridgeConfig, running: &AtomicBool) -> Result<()> {
    let settings = actuator_bridge::write_settings(&config.serial);
    let sink = SerialPortSink::open(&settings).context("Cannot start relay")?;

    let addr = actuator_bridge::bind_addr(&config.udp)?;
    let listener = UdpListener::bind(addr, config.udp.poll_interval())?;
    info!(
        "Relaying {} -> {} at {} baud",
        listener.local_addr(),
        sink.port_name(),
        settings.baud_rate
    );

    // the loop logs its own totals on the way out
    actuator_bridge::dispatch_loop(config, listener, sink).run(running)?;
    Ok(())
}

fn monitor(config: &BridgeConfig, running: &AtomicBool) -> Result<()> {
    let settings = actuator_bridge::read_settings(&config.serial);
    info!(
        "Monitoring {} at {} baud (read timeout {:?})",
        settings.port, settings.baud_rate, settings.timeout
    );

    let mut reader = DiagnosticReader::connect(
        SerialPortConnector::new(settings),
        actuator_bridge::reconnect_policy(&config.diagnostic),
    )
    .context("Cannot start monitor")?
    .with_retry_policy(actuator_bridge::read_retry_policy(&config.diagnostic));

    // frames are logged by the reader
    let stats = reader.run(running, |_| {})?;

    info!(
        "Monitor stopped: {} frames, {} timeouts, {} reconnects",
        stats.frames, stats.timeouts, stats.reconnects
    );
    Ok(())
}
