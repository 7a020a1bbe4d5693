// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Diagnostic reader loop
//!
//! Reads raw 8-byte frames back from a serial device and renders each one as
//! space-separated decimal bytes. No structural validation is applied; a
//! frame is simply the next eight bytes on the line.
//!
//! Timeouts are expected and retried according to [`ReadRetryPolicy`]. A
//! hard read failure releases the device and, when a [`SinkConnector`] is
//! attached, reopens it with linear backoff ([`ReconnectPolicy`]).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use bridge_protocol::{format_diagnostic, FRAME_LEN};
use tracing::{error, info, trace, warn};

use crate::error::{BridgeIoError, Result};
use crate::serial::{SerialSink, SinkConnector, SinkError};

/// Eight raw bytes read from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticFrame([u8; FRAME_LEN]);

impl DiagnosticFrame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

impl fmt::Display for DiagnosticFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_diagnostic(&self.0))
    }
}

/// Result of a single read attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(DiagnosticFrame),
    TimedOut,
}

/// How many consecutive timeouts to tolerate. `None` retries forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRetryPolicy {
    pub max_consecutive_timeouts: Option<u32>,
}

impl ReadRetryPolicy {
    fn is_exhausted(&self, consecutive: u32) -> bool {
        self.max_consecutive_timeouts
            .is_some_and(|limit| consecutive >= limit)
    }
}

/// Reconnect attempts after a hard read failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    /// Delay before attempt `n` is `backoff * n`
    pub backoff: Duration,
}

impl ReconnectPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub frames: u64,
    pub timeouts: u64,
    pub reconnects: u64,
}

type BoxedConnector<S> = Box<dyn SinkConnector<Sink = S> + Send>;

pub struct DiagnosticReader<S: SerialSink> {
    sink: Option<S>,
    connector: Option<BoxedConnector<S>>,
    retry: ReadRetryPolicy,
    reconnect: ReconnectPolicy,
    stats: ReaderStats,
}

impl<S: SerialSink> DiagnosticReader<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Some(sink),
            connector: None,
            retry: ReadRetryPolicy::default(),
            reconnect: ReconnectPolicy::default(),
            stats: ReaderStats::default(),
        }
    }

    /// Open the first sink through `connector` and keep it for reconnects
    ///
    /// # Errors
    /// `BridgeIoError::Sink` if the device cannot be opened
    pub fn connect<C>(mut connector: C, policy: ReconnectPolicy) -> Result<Self>
    where
        C: SinkConnector<Sink = S> + Send + 'static,
    {
        let sink = connector.connect()?;
        Ok(Self::new(sink).with_reconnect(connector, policy))
    }

    pub fn with_retry_policy(mut self, retry: ReadRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reopen the device through `connector` after hard read failures
    pub fn with_reconnect<C>(mut self, connector: C, policy: ReconnectPolicy) -> Self
    where
        C: SinkConnector<Sink = S> + Send + 'static,
    {
        self.connector = Some(Box::new(connector));
        self.reconnect = policy;
        self
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// The currently open sink, if any
    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    /// One read of exactly one frame
    ///
    /// # Errors
    /// `SinkError::DeviceRead` on a hard failure or when no device is open
    pub fn poll_frame(&mut self) -> std::result::Result<ReadOutcome, SinkError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| SinkError::DeviceRead("serial device is not open".to_string()))?;

        let mut bytes = [0u8; FRAME_LEN];
        match sink.read_exact_frame(&mut bytes) {
            Ok(()) => Ok(ReadOutcome::Frame(DiagnosticFrame(bytes))),
            Err(SinkError::Timeout) => Ok(ReadOutcome::TimedOut),
            Err(e) => Err(e),
        }
    }

    /// Read and log frames until `running` is cleared.
    ///
    /// Every frame is logged at info level and passed to `on_frame`.
    ///
    /// # Errors
    /// - `ReadTimeoutsExhausted` when the retry policy runs out
    /// - `DeviceLost` when a hard failure cannot be recovered
    pub fn run<F>(&mut self, running: &AtomicBool, mut on_frame: F) -> Result<ReaderStats>
    where
        F: FnMut(&DiagnosticFrame),
    {
        let mut consecutive_timeouts = 0u32;

        while running.load(Ordering::Relaxed) {
            match self.poll_frame() {
                Ok(ReadOutcome::Frame(frame)) => {
                    consecutive_timeouts = 0;
                    self.stats.frames += 1;
                    info!("{}", frame);
                    on_frame(&frame);
                }
                Ok(ReadOutcome::TimedOut) => {
                    consecutive_timeouts += 1;
                    self.stats.timeouts += 1;
                    trace!("Read timed out ({} in a row)", consecutive_timeouts);
                    if self.retry.is_exhausted(consecutive_timeouts) {
                        warn!("Stopping after {} consecutive read timeouts", consecutive_timeouts);
                        return Err(BridgeIoError::ReadTimeoutsExhausted {
                            timeouts: consecutive_timeouts,
                        });
                    }
                }
                Err(e) => {
                    consecutive_timeouts = 0;
                    warn!("{}", e);
                    self.recover(e, running)?;
                }
            }
        }

        Ok(self.stats)
    }

    fn recover(&mut self, cause: SinkError, running: &AtomicBool) -> Result<()> {
        // release the device before trying to open it again
        self.sink = None;

        let Some(connector) = self.connector.as_mut() else {
            error!("No reconnect configured; serial device lost");
            return Err(BridgeIoError::DeviceLost {
                attempts: 0,
                last_error: cause.to_string(),
            });
        };

        let mut last_error = cause.to_string();
        for attempt in 1..=self.reconnect.max_attempts {
            if !running.load(Ordering::Relaxed) {
                return Ok(());
            }
            thread::sleep(self.reconnect.delay_for(attempt));

            match connector.connect() {
                Ok(sink) => {
                    info!(
                        "Reconnected to {} (attempt {}/{})",
                        sink.port_name(),
                        attempt,
                        self.reconnect.max_attempts
                    );
                    self.sink = Some(sink);
                    self.stats.reconnects += 1;
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Reconnect attempt {}/{} failed: {}",
                        attempt, self.reconnect.max_attempts, e
                    );
                    last_error = e.to_string();
                }
            }
        }

        error!("Serial device lost after {} reconnect attempts", self.reconnect.max_attempts);
        Err(BridgeIoError::DeviceLost {
            attempts: self.reconnect.max_attempts,
            last_error,
        })
    }
}
