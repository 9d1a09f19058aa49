//! UDP datagram source
//!
//! One datagram carries one wire frame. The socket is non-blocking, so
//! `WouldBlock` simply means the kernel queue is empty.
//!
//! ## Example
//!
//! ```rust,no_run
//! use doa_core::transport::{FrameSource, UdpFrameSource, UdpSourceConfig};
//!
//! let mut src = UdpFrameSource::bind(&UdpSourceConfig::default())?;
//! let batch = src.drain(256);
//! println!("{} frames, {} bytes total", batch.len(), src.total_bytes());
//! # Ok::<(), doa_core::DoaError>(())
//! ```

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use serde::{Deserialize, Serialize};

use super::FrameSource;
use crate::types::{DoaError, DoaResult};

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM: usize = 65_507;

/// UDP receiver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpSourceConfig {
    /// Local `host:port` to bind
    pub bind: String,
    /// Receive buffer per datagram in bytes. Longer datagrams are truncated
    /// by the OS and then rejected by the decoder.
    pub recv_buf_size: usize,
}

impl Default for UdpSourceConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5555".to_string(),
            recv_buf_size: MAX_DATAGRAM,
        }
    }
}

/// Non-blocking UDP frame source.
#[derive(Debug)]
pub struct UdpFrameSource {
    socket: UdpSocket,
    buf: Vec<u8>,
    total_datagrams: u64,
    total_bytes: u64,
}

impl UdpFrameSource {
    /// Bind the configured address and switch the socket to non-blocking.
    pub fn bind(config: &UdpSourceConfig) -> DoaResult<Self> {
        let socket = UdpSocket::bind(&config.bind)?;
        socket.set_nonblocking(true)?;
        tracing::info!(addr = %config.bind, "UDP frame source bound");
        Ok(Self {
            socket,
            buf: vec![0u8; config.recv_buf_size.max(1)],
            total_datagrams: 0,
            total_bytes: 0,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> DoaResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn total_datagrams(&self) -> u64 {
        self.total_datagrams
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

impl FrameSource for UdpFrameSource {
    fn try_recv(&mut self) -> DoaResult<Option<Vec<u8>>> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((n, peer)) => {
                self.total_datagrams += 1;
                self.total_bytes += n as u64;
                tracing::trace!(bytes = n, %peer, "datagram received");
                Ok(Some(self.buf[..n].to_vec()))
            }
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(DoaError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn loopback() -> UdpFrameSource {
        UdpFrameSource::bind(&UdpSourceConfig {
            bind: "127.0.0.1:0".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_empty_socket_returns_none() {
        let mut src = loopback();
        assert_eq!(src.try_recv().unwrap(), None);
        assert_eq!(src.total_datagrams(), 0);
    }

    #[test]
    fn test_receives_datagrams() {
        let mut src = loopback();
        let addr = src.local_addr().unwrap();
        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        tx.send_to(&[1, 2, 3, 4], addr).unwrap();
        tx.send_to(&[5, 6], addr).unwrap();

        let mut got = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        while got.len() < 2 && Instant::now() < deadline {
            got.extend(src.drain(8));
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(got, vec![vec![1, 2, 3, 4], vec![5, 6]]);
        assert_eq!(src.total_datagrams(), 2);
        assert_eq!(src.total_bytes(), 6);
    }

    #[test]
    fn test_config_defaults() {
        let cfg = UdpSourceConfig::default();
        assert_eq!(cfg.bind, "0.0.0.0:5555");
        assert_eq!(cfg.recv_buf_size, MAX_DATAGRAM);
    }
}
