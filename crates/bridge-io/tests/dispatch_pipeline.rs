//! Dispatch pipeline behaviour driven through scripted datagrams.

mod common;

use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use bridge_io::{BridgeIoError, DispatchLoop, WriteFailurePolicy};
use bridge_protocol::CommandDefaults;
use common::{RecordingSink, ScriptedSource};

fn run_script(datagrams: &[&str], sink: RecordingSink) -> bridge_io::Result<bridge_io::DispatchStats> {
    let running = Arc::new(AtomicBool::new(true));
    let source = ScriptedSource::new(datagrams.iter().map(|d| d.as_bytes()), running.clone());
    DispatchLoop::new(source, sink).run(&running)
}

#[test]
fn three_tokens_write_one_defaulted_frame() {
    let sink = RecordingSink::default();
    let stats = run_script(&["10 20 30"], sink.clone()).unwrap();

    assert_eq!(sink.written(), vec![vec![0x41, 0x42, 0xFF, 10, 20, 30, 100, 0]]);
    assert_eq!(stats.written, 1);
}

/// Log sink shared with the test body
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn received_commands_are_logged_at_info() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        run_script(&["  10 20 30\n", "7 8"], RecordingSink::default()).unwrap();
    });

    let text = logs.text();
    assert!(text.contains("Received command: 10 20 30"), "{text}");
    assert!(text.contains("Received command: 7 8"), "{text}");
}

#[test]
fn two_tokens_write_nothing() {
    let sink = RecordingSink::default();
    let stats = run_script(&["10 20"], sink.clone()).unwrap();

    assert!(sink.written().is_empty());
    assert_eq!(stats.malformed, 1);
}

#[test]
fn out_of_range_writes_nothing() {
    let sink = RecordingSink::default();
    let stats = run_script(&["300 20 30", "10 -1 30"], sink.clone()).unwrap();

    assert!(sink.written().is_empty());
    assert_eq!(stats.out_of_range, 2);
}

#[test]
fn bad_commands_do_not_stop_the_loop() {
    let sink = RecordingSink::default();
    let stats = run_script(&["garbage", "1 2 3", "999 0 0", "4 5 6"], sink.clone()).unwrap();

    let payloads: Vec<Vec<u8>> = sink.written().iter().map(|f| f[3..6].to_vec()).collect();
    assert_eq!(payloads, vec![vec![1, 2, 3], vec![4, 5, 6]]);
    assert_eq!(stats.received, 4);
}

#[test]
fn frames_preserve_arrival_order() {
    let datagrams: Vec<String> = (0..50).map(|i| format!("{} {} {}", i, i + 1, i + 2)).collect();
    let refs: Vec<&str> = datagrams.iter().map(String::as_str).collect();
    let sink = RecordingSink::default();
    run_script(&refs, sink.clone()).unwrap();

    let written = sink.written();
    assert_eq!(written.len(), 50);
    for (i, frame) in written.iter().enumerate() {
        assert_eq!(frame[3] as usize, i);
    }
}

#[test]
fn write_failures_are_recoverable_by_default() {
    let sink = RecordingSink::failing(&[true, true, true]);
    let stats = run_script(&["1 1 1", "2 2 2", "3 3 3", "4 4 4"], sink.clone()).unwrap();

    assert_eq!(stats.write_failures, 3);
    assert_eq!(sink.written().len(), 1);
    assert_eq!(sink.written()[0][3], 4);
}

#[test]
fn write_failures_escalate_when_configured() {
    let running = Arc::new(AtomicBool::new(true));
    let source = ScriptedSource::new(["1 1 1", "2 2 2", "3 3 3"], running.clone());
    let sink = RecordingSink::failing(&[true, true, true]);

    let result = DispatchLoop::new(source, sink)
        .with_write_failure_policy(WriteFailurePolicy::escalate_after(2))
        .run(&running);

    assert_eq!(
        result,
        Err(BridgeIoError::SinkUnavailable {
            consecutive_failures: 2
        })
    );
}

#[test]
fn successful_write_resets_failure_streak() {
    let running = Arc::new(AtomicBool::new(true));
    let source = ScriptedSource::new(["1 1 1", "2 2 2", "3 3 3", "4 4 4"], running.clone());
    let sink = RecordingSink::failing(&[true, false, true, false]);

    let stats = DispatchLoop::new(source, sink)
        .with_write_failure_policy(WriteFailurePolicy::escalate_after(2))
        .run(&running)
        .unwrap();

    assert_eq!(stats.write_failures, 2);
    assert_eq!(stats.written, 2);
}

#[test]
fn configured_defaults_fill_turn_and_wind() {
    let running = Arc::new(AtomicBool::new(true));
    let source = ScriptedSource::new(["5 6 7"], running.clone());
    let sink = RecordingSink::default();

    DispatchLoop::new(source, sink.clone())
        .with_defaults(CommandDefaults { turn: 42, wind: 3 })
        .run(&running)
        .unwrap();

    assert_eq!(sink.written(), vec![vec![0x41, 0x42, 0xFF, 5, 6, 7, 42, 3]]);
}

#[test]
fn oversized_datagram_is_truncated_to_limit() {
    let running = Arc::new(AtomicBool::new(true));
    // "1 2 3" survives an 8 byte limit, the trailing junk does not matter
    let source = ScriptedSource::new(["1 2 3 444444444444"], running.clone());
    let sink = RecordingSink::default();

    DispatchLoop::new(source, sink.clone())
        .with_max_datagram_size(8)
        .run(&running)
        .unwrap();

    assert_eq!(sink.written().len(), 1);
}
