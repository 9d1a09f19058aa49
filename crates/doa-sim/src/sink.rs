//! UDP frame sink
//!
//! Sends one encoded frame per datagram, mirroring what a CSI capture
//! process would push to the estimator.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use doa_core::{CsiFrame, DoaError, DoaResult, HeaderLayout};

/// Datagram sender for encoded CSI frames.
#[derive(Debug)]
pub struct UdpFrameSink {
    socket: UdpSocket,
    dest: SocketAddr,
    layout: HeaderLayout,
    total_datagrams: u64,
    total_bytes: u64,
}

impl UdpFrameSink {
    /// Bind an ephemeral local port and target `dest`.
    pub fn connect(dest: impl ToSocketAddrs, layout: HeaderLayout) -> DoaResult<Self> {
        let dest = dest
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| DoaError::Transport("destination resolved to no address".into()))?;
        let local = if dest.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)?;
        tracing::debug!(%dest, ?layout, "UDP frame sink ready");
        Ok(Self {
            socket,
            dest,
            layout,
            total_datagrams: 0,
            total_bytes: 0,
        })
    }

    /// Send an already encoded message.
    pub fn send_raw(&mut self, message: &[u8]) -> DoaResult<usize> {
        let n = self.socket.send_to(message, self.dest)?;
        self.total_datagrams += 1;
        self.total_bytes += n as u64;
        Ok(n)
    }

    /// Encode `frame` with the sink's header layout and send it.
    pub fn send(&mut self, frame: &CsiFrame) -> DoaResult<usize> {
        let message = frame.encode(self.layout)?;
        self.send_raw(&message)
    }

    pub fn dest(&self) -> SocketAddr {
        self.dest
    }

    pub fn total_datagrams(&self) -> u64 {
        self.total_datagrams
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlaneWave, PlaneWaveConfig};
    use doa_core::{FrameDecoder, FrameSource, UdpFrameSource, UdpSourceConfig};
    use std::time::{Duration, Instant};

    #[test]
    fn test_sink_to_source() {
        let mut source = UdpFrameSource::bind(&UdpSourceConfig {
            bind: "127.0.0.1:0".into(),
            ..Default::default()
        })
        .unwrap();
        let mut sink =
            UdpFrameSink::connect(source.local_addr().unwrap(), HeaderLayout::Batched).unwrap();

        let mut wave = PlaneWave::new(PlaneWaveConfig {
            antennas: 4,
            subcarriers: 16,
            ..Default::default()
        });
        let frame = wave.generate().unwrap();
        let sent = sink.send(&frame).unwrap();
        assert_eq!(sent, 12 + 4 * 16 * 8);
        assert_eq!(sink.total_datagrams(), 1);

        let deadline = Instant::now() + Duration::from_secs(2);
        let message = loop {
            if let Some(msg) = source.try_recv().unwrap() {
                break msg;
            }
            assert!(Instant::now() < deadline, "datagram not received");
            std::thread::sleep(Duration::from_millis(1));
        };
        assert_eq!(FrameDecoder::default().decode(&message).unwrap(), frame);
    }
}
