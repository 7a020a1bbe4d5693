// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::serial::SinkError;

/// Errors that stop a bridge loop
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeIoError {
    /// Failed to bind the UDP socket
    #[error("Unable to bind {addr}: {reason}")]
    CannotBind { addr: String, reason: String },

    /// The UDP socket failed while waiting for a datagram
    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    /// The serial device could not be opened
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Write failures reached the configured escalation limit
    #[error("Serial sink unavailable after {consecutive_failures} consecutive write failures")]
    SinkUnavailable { consecutive_failures: u32 },

    /// Read timeouts reached the configured retry limit
    #[error("No frame received after {timeouts} consecutive read timeouts")]
    ReadTimeoutsExhausted { timeouts: u32 },

    /// A hard read failure that reconnecting could not recover from
    #[error("Serial device lost after {attempts} reconnect attempts: {last_error}")]
    DeviceLost { attempts: u32, last_error: String },
}

pub type Result<T> = std::result::Result<T, BridgeIoError>;
