// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Serial sink abstraction
//!
//! The sink is the only component that touches the physical link. It is
//! opened once, owned by exactly one loop, and closed when dropped.

use std::io::{ErrorKind, Read};

/// Failures reported by a serial sink
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The device could not be opened
    #[error("Unable to open serial port {port}: {reason}")]
    Open { port: String, reason: String },

    /// A frame could not be handed to the device
    #[error("Serial write failed: {0}")]
    DeviceWrite(String),

    /// No complete frame arrived within the read timeout
    #[error("Serial read timed out")]
    Timeout,

    /// The device faulted or disappeared while reading
    #[error("Serial read failed: {0}")]
    DeviceRead(String),
}

impl SinkError {
    /// Timeouts are expected on the read path and are retried
    pub fn is_timeout(&self) -> bool {
        matches!(self, SinkError::Timeout)
    }
}

/// Owned handle on a serial device
pub trait SerialSink {
    /// Device path the sink was opened on (e.g. "COM6", "/dev/ttyUSB0")
    fn port_name(&self) -> &str;

    /// Write a whole frame, blocking until the OS has accepted every byte
    ///
    /// # Errors
    /// `SinkError::DeviceWrite` if the device is gone, closed or overrun
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), SinkError>;

    /// Fill `buf` completely, blocking at most the configured read timeout
    ///
    /// # Errors
    /// - `SinkError::Timeout` if the buffer could not be filled in time
    /// - `SinkError::DeviceRead` on a hard I/O fault
    fn read_exact_frame(&mut self, buf: &mut [u8]) -> Result<(), SinkError>;
}

/// Opens fresh sinks, used to recover from hard read failures
pub trait SinkConnector {
    type Sink: SerialSink;

    fn connect(&mut self) -> Result<Self::Sink, SinkError>;
}

/// Fill `buf` from `reader`, starting with any bytes held in `pending`.
///
/// On a timeout the bytes read so far move back into `pending`, so the next
/// call resumes the same frame instead of splitting the stream.
#[cfg_attr(not(feature = "serial-transport"), allow(dead_code))]
fn fill_frame<R: Read + ?Sized>(
    reader: &mut R,
    name: &str,
    pending: &mut Vec<u8>,
    buf: &mut [u8],
) -> Result<(), SinkError> {
    let mut filled = pending.len().min(buf.len());
    buf[..filled].copy_from_slice(&pending[..filled]);
    pending.drain(..filled);

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(SinkError::DeviceRead(format!(
                    "{}: device closed the stream",
                    name
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                pending.splice(0..0, buf[..filled].iter().copied());
                return Err(SinkError::Timeout);
            }
            Err(e) => return Err(SinkError::DeviceRead(format!("{}: {}", name, e))),
        }
    }
    Ok(())
}

#[cfg(feature = "serial-transport")]
pub use self::port::{SerialPortConnector, SerialPortSink, SerialSettings};

#[cfg(feature = "serial-transport")]
mod port {
    use std::io::Write;
    use std::time::Duration;

    use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
    use tracing::{debug, info};

    use super::{fill_frame, SerialSink, SinkConnector, SinkError};

    /// Settings for opening a serial device. Framing is always 8-N-1.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SerialSettings {
        pub port: String,
        pub baud_rate: u32,
        /// Applies to reads and writes
        pub timeout: Duration,
    }

    impl SerialSettings {
        pub fn new(port: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
            Self {
                port: port.into(),
                baud_rate,
                timeout,
            }
        }
    }

    /// Serial sink backed by the `serialport` crate
    pub struct SerialPortSink {
        port: Box<dyn SerialPort>,
        name: String,
        /// Bytes received before a read timed out; they start the next frame
        pending: Vec<u8>,
    }

    impl SerialPortSink {
        pub fn open(settings: &SerialSettings) -> Result<Self, SinkError> {
            let port = serialport::new(settings.port.as_str(), settings.baud_rate)
                .timeout(settings.timeout)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .open()
                .map_err(|e| SinkError::Open {
                    port: settings.port.clone(),
                    reason: e.to_string(),
                })?;

            info!(
                "Opened serial port {} at {} baud (timeout {:?})",
                settings.port, settings.baud_rate, settings.timeout
            );

            Ok(Self {
                port,
                name: settings.port.clone(),
                pending: Vec::new(),
            })
        }
    }

    impl SerialSink for SerialPortSink {
        fn port_name(&self) -> &str {
            &self.name
        }

        fn write_frame(&mut self, frame: &[u8]) -> Result<(), SinkError> {
            self.port
                .write_all(frame)
                .and_then(|_| self.port.flush())
                .map_err(|e| SinkError::DeviceWrite(format!("{}: {}", self.name, e)))
        }

        fn read_exact_frame(&mut self, buf: &mut [u8]) -> Result<(), SinkError> {
            fill_frame(&mut self.port, &self.name, &mut self.pending, buf)
        }
    }

    impl Drop for SerialPortSink {
        fn drop(&mut self) {
            debug!("Released serial port {}", self.name);
        }
    }

    /// Reopens a [`SerialPortSink`] from fixed settings
    #[derive(Debug, Clone)]
    pub struct SerialPortConnector {
        settings: SerialSettings,
    }

    impl SerialPortConnector {
        pub fn new(settings: SerialSettings) -> Self {
            Self { settings }
        }

        pub fn settings(&self) -> &SerialSettings {
            &self.settings
        }
    }

    impl SinkConnector for SerialPortConnector {
        type Sink = SerialPortSink;

        fn connect(&mut self) -> Result<SerialPortSink, SinkError> {
            SerialPortSink::open(&self.settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;

    /// Reader that replays a fixed sequence of read results
    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    assert!(bytes.len() <= buf.len(), "scripted chunk larger than the read");
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::new(ErrorKind::TimedOut, "script exhausted")),
            }
        }
    }

    fn timed_out() -> io::Result<Vec<u8>> {
        Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
    }

    #[test]
    fn test_partial_frame_survives_timeout() {
        let mut reader = ScriptedReader::new(vec![
            Ok(vec![0xFF, 0xFF, 10, 20, 30]),
            timed_out(),
            Ok(vec![100, 0, 0x0A]),
        ]);
        let mut pending = Vec::new();
        let mut buf = [0u8; 8];

        let err = fill_frame(&mut reader, "COM3", &mut pending, &mut buf).unwrap_err();
        assert_eq!(err, SinkError::Timeout);
        assert_eq!(pending, vec![0xFF, 0xFF, 10, 20, 30]);

        let mut buf = [0u8; 8];
        fill_frame(&mut reader, "COM3", &mut pending, &mut buf).unwrap();
        assert_eq!(buf, [0xFF, 0xFF, 10, 20, 30, 100, 0, 0x0A]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_bytes_beyond_one_frame_are_kept() {
        let mut reader = ScriptedReader::new(vec![]);
        let mut pending = vec![1, 2, 3, 4, 5];
        let mut buf = [0u8; 3];

        fill_frame(&mut reader, "COM3", &mut pending, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(pending, vec![4, 5]);
    }

    #[test]
    fn test_closed_stream_is_device_read() {
        let mut reader = ScriptedReader::new(vec![Ok(vec![0xFF]), Ok(vec![])]);
        let mut pending = Vec::new();
        let mut buf = [0u8; 8];

        match fill_frame(&mut reader, "COM3", &mut pending, &mut buf) {
            Err(SinkError::DeviceRead(msg)) => assert!(msg.contains("COM3")),
            other => panic!("expected a device read error, got {other:?}"),
        }
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let mut reader = ScriptedReader::new(vec![
            Ok(vec![1, 2]),
            Err(io::Error::new(ErrorKind::Interrupted, "signal")),
            Ok(vec![3, 4]),
        ]);
        let mut pending = Vec::new();
        let mut buf = [0u8; 4];

        fill_frame(&mut reader, "COM3", &mut pending, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_hard_fault_is_device_read() {
        let mut reader = ScriptedReader::new(vec![Err(io::Error::new(
            ErrorKind::BrokenPipe,
            "unplugged",
        ))]);
        let mut pending = Vec::new();
        let mut buf = [0u8; 8];

        let err = fill_frame(&mut reader, "COM3", &mut pending, &mut buf).unwrap_err();
        assert!(matches!(err, SinkError::DeviceRead(_)));
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_only_timeout_is_timeout() {
        assert!(SinkError::Timeout.is_timeout());
        assert!(!SinkError::DeviceRead("gone".to_string()).is_timeout());
        assert!(!SinkError::DeviceWrite("gone".to_string()).is_timeout());
    }

    #[cfg(feature = "serial-transport")]
    #[test]
    fn test_open_missing_port_reports_port_name() {
        let settings = SerialSettings::new(
            "/dev/does-not-exist-bridge",
            9600,
            std::time::Duration::from_millis(10),
        );
        match SerialPortSink::open(&settings) {
            Err(SinkError::Open { port, .. }) => assert_eq!(port, "/dev/does-not-exist-bridge"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing device should fail"),
        }
    }
}
