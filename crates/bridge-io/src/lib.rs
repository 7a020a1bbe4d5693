// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # bridge-io
//!
//! The I/O side of the actuator bridge:
//!
//! - [`serial`]: the [`SerialSink`] abstraction over the physical link, plus a
//!   `serialport` backed implementation
//! - [`udp`]: the [`DatagramSource`] abstraction and the UDP listener
//! - [`dispatch`]: the LISTENING/DISPATCHING loop relaying commands to the sink
//! - [`diagnostic`]: the read-only loop rendering frames coming back from a device
//!
//! Sockets and devices are owned by the loop that uses them and passed in at
//! construction, so tests can hand in fakes.

pub mod diagnostic;
pub mod dispatch;
mod error;
pub mod serial;
pub mod udp;

pub use diagnostic::{
    DiagnosticFrame, DiagnosticReader, ReadOutcome, ReadRetryPolicy, ReaderStats, ReconnectPolicy,
};
pub use dispatch::{DispatchError, DispatchLoop, DispatchState, DispatchStats, WriteFailurePolicy};
pub use error::{BridgeIoError, Result};
pub use serial::{SerialSink, SinkConnector, SinkError};
pub use udp::{DatagramSource, UdpListener, DEFAULT_MAX_DATAGRAM_SIZE};

#[cfg(feature = "serial-transport")]
pub use serial::{SerialPortConnector, SerialPortSink, SerialSettings};
