//! Fakes shared by the bridge-io integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bridge_io::{DatagramSource, SerialSink, SinkConnector, SinkError};

/// Records every written frame; optionally fails scripted writes.
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
    /// One entry per write; `true` makes that write fail. Empty = succeed.
    pub write_failures: Arc<Mutex<VecDeque<bool>>>,
}

impl RecordingSink {
    pub fn failing(script: &[bool]) -> Self {
        let sink = Self::default();
        sink.write_failures
            .lock()
            .unwrap()
            .extend(script.iter().copied());
        sink
    }

    pub fn written(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }
}

impl SerialSink for RecordingSink {
    fn port_name(&self) -> &str {
        "recording"
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), SinkError> {
        let fail = self
            .write_failures
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(false);
        if fail {
            return Err(SinkError::DeviceWrite("buffer overrun".to_string()));
        }
        self.frames.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    fn read_exact_frame(&mut self, _buf: &mut [u8]) -> Result<(), SinkError> {
        Err(SinkError::Timeout)
    }
}

/// Yields scripted datagrams, then clears the shared running flag.
pub struct ScriptedSource {
    datagrams: VecDeque<Vec<u8>>,
    running: Arc<AtomicBool>,
}

impl ScriptedSource {
    pub fn new<I, T>(datagrams: I, running: Arc<AtomicBool>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self {
            datagrams: datagrams.into_iter().map(|d| d.as_ref().to_vec()).collect(),
            running,
        }
    }
}

impl DatagramSource for ScriptedSource {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> bridge_io::Result<Option<usize>> {
        match self.datagrams.pop_front() {
            Some(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(Some(len))
            }
            None => {
                self.running.store(false, Ordering::SeqCst);
                Ok(None)
            }
        }
    }
}

/// One scripted outcome of `read_exact_frame`
#[derive(Debug, Clone)]
pub enum ReadStep {
    Frame([u8; 8]),
    Timeout,
    Fail(&'static str),
}

/// Replays read steps; once the script is exhausted it clears the running
/// flag and reports timeouts.
pub struct ScriptedReadSink {
    name: String,
    steps: VecDeque<ReadStep>,
    running: Arc<AtomicBool>,
}

impl ScriptedReadSink {
    pub fn new(name: &str, steps: Vec<ReadStep>, running: Arc<AtomicBool>) -> Self {
        Self {
            name: name.to_string(),
            steps: steps.into(),
            running,
        }
    }
}

impl SerialSink for ScriptedReadSink {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn write_frame(&mut self, _frame: &[u8]) -> Result<(), SinkError> {
        Err(SinkError::DeviceWrite("read-only".to_string()))
    }

    fn read_exact_frame(&mut self, buf: &mut [u8]) -> Result<(), SinkError> {
        match self.steps.pop_front() {
            Some(ReadStep::Frame(bytes)) => {
                buf.copy_from_slice(&bytes);
                Ok(())
            }
            Some(ReadStep::Timeout) => Err(SinkError::Timeout),
            Some(ReadStep::Fail(reason)) => Err(SinkError::DeviceRead(reason.to_string())),
            None => {
                self.running.store(false, Ordering::SeqCst);
                Err(SinkError::Timeout)
            }
        }
    }
}

/// Hands out prepared sinks; `None` entries fail to open.
pub struct ScriptedConnector {
    pub attempts: Arc<Mutex<u32>>,
    sinks: VecDeque<Option<ScriptedReadSink>>,
}

impl ScriptedConnector {
    pub fn new(sinks: Vec<Option<ScriptedReadSink>>) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(0)),
            sinks: sinks.into(),
        }
    }
}

impl SinkConnector for ScriptedConnector {
    type Sink = ScriptedReadSink;

    fn connect(&mut self) -> Result<ScriptedReadSink, SinkError> {
        *self.attempts.lock().unwrap() += 1;
        match self.sinks.pop_front().flatten() {
            Some(sink) => Ok(sink),
            None => Err(SinkError::Open {
                port: "scripted".to_string(),
                reason: "no such device".to_string(),
            }),
        }
    }
}
