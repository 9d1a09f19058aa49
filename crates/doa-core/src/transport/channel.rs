//! In-process source backed by an `mpsc` channel.

use std::sync::mpsc::{Receiver, TryRecvError};

use super::FrameSource;
use crate::types::DoaResult;

/// Receiving half of an `mpsc` channel carrying wire frames.
///
/// A disconnected sender behaves like an idle one: the estimator keeps
/// showing the last spectrum instead of failing.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    disconnected: bool,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// True once every sender has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl From<Receiver<Vec<u8>>> for ChannelSource {
    fn from(rx: Receiver<Vec<u8>>) -> Self {
        Self::new(rx)
    }
}

impl FrameSource for ChannelSource {
    fn try_recv(&mut self) -> DoaResult<Option<Vec<u8>>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                if !self.disconnected {
                    tracing::info!("frame channel disconnected");
                    self.disconnected = true;
                }
                Ok(None)
            }
        }
    }
}
