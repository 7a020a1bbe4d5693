// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! UDP command intake

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::info;

use crate::error::{BridgeIoError, Result};

/// Largest command datagram read from the socket by default
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 128;

const WSAEMSGSIZE: i32 = 10040;

/// Anything that yields command datagrams one at a time
pub trait DatagramSource {
    /// Wait for the next datagram and copy it into `buf`.
    ///
    /// Returns `Ok(None)` when nothing arrived within the source's poll
    /// interval. That is not an error; the caller simply asks again.
    fn recv_datagram(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;
}

/// Blocking UDP listener.
///
/// The socket is owned for the lifetime of the listener. The poll interval
/// only exists so the dispatch loop can notice a shutdown request between
/// datagrams.
pub struct UdpListener {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpListener {
    /// Bind to `addr`. A zero `poll_interval` blocks without limit.
    pub fn bind(addr: SocketAddr, poll_interval: Duration) -> Result<Self> {
        let socket = UdpSocket::bind(addr).map_err(|e| BridgeIoError::CannotBind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

        let timeout = (!poll_interval.is_zero()).then_some(poll_interval);
        socket
            .set_read_timeout(timeout)
            .map_err(|e| BridgeIoError::CannotBind {
                addr: addr.to_string(),
                reason: format!("cannot set poll interval: {}", e),
            })?;

        let local_addr = socket.local_addr().unwrap_or(addr);
        info!("Listening for commands on udp://{}", local_addr);

        Ok(Self { socket, local_addr })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl DatagramSource for UdpListener {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(len) => Ok(Some(len)),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            // WSAEMSGSIZE: Windows reports an oversized datagram as an error
            // after filling `buf` with its first bytes
            Err(e) if cfg!(windows) && e.raw_os_error() == Some(WSAEMSGSIZE) => {
                Ok(Some(buf.len()))
            }
            Err(e) => Err(BridgeIoError::ReceiveFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_poll_interval_yields_none() {
        let mut listener = UdpListener::bind(loopback(), Duration::from_millis(20)).unwrap();
        let mut buf = [0u8; DEFAULT_MAX_DATAGRAM_SIZE];
        assert_eq!(listener.recv_datagram(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_receives_datagram() {
        let mut listener = UdpListener::bind(loopback(), Duration::from_secs(2)).unwrap();
        let sender = UdpSocket::bind(loopback()).unwrap();
        sender.send_to(b"1 2 3", listener.local_addr()).unwrap();

        let mut buf = [0u8; DEFAULT_MAX_DATAGRAM_SIZE];
        let len = listener.recv_datagram(&mut buf).unwrap().unwrap();
        assert_eq!(&buf[..len], b"1 2 3");
    }

    #[test]
    fn test_bind_conflict_is_reported() {
        let first = UdpListener::bind(loopback(), Duration::ZERO).unwrap();
        let err = UdpListener::bind(first.local_addr(), Duration::ZERO)
            .err()
            .expect("second bind on the same port should fail");
        assert!(matches!(err, BridgeIoError::CannotBind { .. }));
    }
}
