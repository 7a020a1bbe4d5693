// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Command dispatch loop
//!
//! ```text
//! ┌───────────┐   datagram arrives   ┌─────────────┐
//! │ Listening │ ───────────────────► │ Dispatching │
//! └───────────┘                      └──────┬──────┘
//!       ▲                                   │
//!       └───── frame written or dropped ────┘
//! ```
//!
//! One datagram is fully handled before the next is received, so frames
//! reach the serial line in exactly the order their datagrams arrived.
//! Malformed and out-of-range commands are dropped and logged; a failed
//! write is logged and the loop keeps listening unless the configured
//! [`WriteFailurePolicy`] says otherwise.

use std::sync::atomic::{AtomicBool, Ordering};

use bridge_protocol::{frame_from_datagram, CommandDefaults, CommandError, ControlFrame};
use tracing::{debug, error, info, warn};

use crate::error::{BridgeIoError, Result};
use crate::serial::{SerialSink, SinkError};
use crate::udp::{DatagramSource, DEFAULT_MAX_DATAGRAM_SIZE};

/// Why a single datagram did not produce a written frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Blocked waiting for a datagram
    Listening,
    /// Handling one received datagram
    Dispatching,
}

/// Counters for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub written: u64,
    pub malformed: u64,
    pub out_of_range: u64,
    pub write_failures: u64,
}

/// When repeated write failures stop the loop.
///
/// `None` never escalates: every failed write is logged and the next
/// datagram is handled as usual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteFailurePolicy {
    pub max_consecutive_failures: Option<u32>,
}

impl WriteFailurePolicy {
    pub fn never_escalate() -> Self {
        Self {
            max_consecutive_failures: None,
        }
    }

    pub fn escalate_after(failures: u32) -> Self {
        Self {
            max_consecutive_failures: Some(failures),
        }
    }

    fn is_exhausted(&self, consecutive: u32) -> bool {
        self.max_consecutive_failures
            .is_some_and(|limit| consecutive >= limit)
    }
}

/// Relays command datagrams from a source to a serial sink
pub struct DispatchLoop<D: DatagramSource, S: SerialSink> {
    source: D,
    sink: S,
    defaults: CommandDefaults,
    max_datagram_size: usize,
    write_policy: WriteFailurePolicy,
    state: DispatchState,
    stats: DispatchStats,
    consecutive_write_failures: u32,
}

impl<D: DatagramSource, S: SerialSink> DispatchLoop<D, S> {
    pub fn new(source: D, sink: S) -> Self {
        Self {
            source,
            sink,
            defaults: CommandDefaults::default(),
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            write_policy: WriteFailurePolicy::default(),
            state: DispatchState::Listening,
            stats: DispatchStats::default(),
            consecutive_write_failures: 0,
        }
    }

    pub fn with_defaults(mut self, defaults: CommandDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Datagrams longer than this are truncated by the socket
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size.max(1);
        self
    }

    pub fn with_write_failure_policy(mut self, policy: WriteFailurePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (D, S) {
        (self.source, self.sink)
    }

    /// Handle one datagram payload: parse, validate, encode, write.
    ///
    /// Nothing is written unless the whole command is valid.
    pub fn dispatch(&mut self, payload: &[u8]) -> std::result::Result<ControlFrame, DispatchError> {
        self.stats.received += 1;

        let frame = match frame_from_datagram(payload, &self.defaults) {
            Ok(frame) => frame,
            Err(e) => {
                match e {
                    CommandError::Malformed(_) => self.stats.malformed += 1,
                    CommandError::OutOfRange(_) => self.stats.out_of_range += 1,
                }
                return Err(e.into());
            }
        };

        match self.sink.write_frame(frame.as_bytes()) {
            Ok(()) => {
                self.stats.written += 1;
                self.consecutive_write_failures = 0;
                Ok(frame)
            }
            Err(e) => {
                self.stats.write_failures += 1;
                self.consecutive_write_failures += 1;
                Err(e.into())
            }
        }
    }

    /// Run until `running` is cleared.
    ///
    /// # Errors
    /// - `ReceiveFailed` if the datagram source faults
    /// - `SinkUnavailable` if the write failure policy is exhausted
    pub fn run(&mut self, running: &AtomicBool) -> Result<DispatchStats> {
        let mut buf = vec![0u8; self.max_datagram_size];
        info!(
            "Relaying commands to serial port {} (max datagram {} bytes)",
            self.sink.port_name(),
            self.max_datagram_size
        );

        while running.load(Ordering::Relaxed) {
            self.state = DispatchState::Listening;
            let len = match self.source.recv_datagram(&mut buf) {
                Ok(Some(len)) => len,
                Ok(None) => continue,
                Err(e) => {
                    error!("Command socket failed: {}", e);
                    return Err(e);
                }
            };

            self.state = DispatchState::Dispatching;
            let payload = &buf[..len];
            info!("Received command: {}", String::from_utf8_lossy(payload).trim());

            match self.dispatch(payload) {
                Ok(frame) => debug!("Wrote frame [{}]", frame),
                Err(DispatchError::Command(e)) => warn!("Dropped command: {}", e),
                Err(DispatchError::Sink(e)) => {
                    warn!("{}", e);
                    if self.write_policy.is_exhausted(self.consecutive_write_failures) {
                        self.state = DispatchState::Listening;
                        error!(
                            "Giving up after {} consecutive write failures",
                            self.consecutive_write_failures
                        );
                        return Err(BridgeIoError::SinkUnavailable {
                            consecutive_failures: self.consecutive_write_failures,
                        });
                    }
                }
            }
        }

        self.state = DispatchState::Listening;
        info!(
            "Dispatch loop stopped: {} received, {} written, {} dropped, {} write failures",
            self.stats.received,
            self.stats.written,
            self.stats.malformed + self.stats.out_of_range,
            self.stats.write_failures
        );
        Ok(self.stats)
    }
}
