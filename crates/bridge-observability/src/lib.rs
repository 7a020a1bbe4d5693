// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # bridge-observability
//!
//! Logging setup for the actuator bridge binaries, with per-crate debug
//! flag support.
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped folder per run

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Workspace crates that emit log events and accept debug flags
///
/// `bridge-protocol` and `bridge-config` do not log; their errors surface
/// through the callers in `bridge-io` and the binary.
pub const KNOWN_CRATES: &[&str] = &["bridge-io", "actuator-bridge"];

/// Errors raised while building the logging setup
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Unknown crate '{0}' (expected one of: {})", KNOWN_CRATES.join(", "))]
    UnknownCrate(String),

    #[error("Invalid log level '{0}' (expected trace, debug, info, warn or error)")]
    InvalidLevel(String),
}

/// Tracing target for a crate name (`bridge-io` logs under `bridge_io`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
