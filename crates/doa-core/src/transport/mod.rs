//! Message sources feeding the estimator
//!
//! The estimator never blocks on I/O. A [`FrameSource`] is polled until it
//! reports that nothing is queued, and whatever arrived in the meantime forms
//! one ingest batch:
//!
//! ```text
//!   sender ──▶ [ queue / socket ] ──try_recv()──▶ drain(max) ──▶ ingest_batch
//!                                    Ok(None) = nothing queued now
//! ```
//!
//! Each message is one complete wire frame (header + payload).

pub mod channel;
pub mod udp;

pub use channel::ChannelSource;
pub use udp::{UdpFrameSource, UdpSourceConfig};

use crate::types::DoaResult;

/// Upper bound on messages pulled per drain when the caller has no opinion.
pub const DEFAULT_DRAIN_LIMIT: usize = 1024;

/// Non-blocking source of raw frame messages.
pub trait FrameSource {
    /// Pop one queued message.
    ///
    /// `Ok(None)` means nothing is available right now; it is not an error
    /// and says nothing about whether more will arrive later.
    fn try_recv(&mut self) -> DoaResult<Option<Vec<u8>>>;

    /// Pop up to `max` queued messages.
    ///
    /// Stops at the first `Ok(None)`. A transport error ends the drain; the
    /// messages already collected are still returned.
    fn drain(&mut self, max: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while out.len() < max {
            match self.try_recv() {
                Ok(Some(msg)) => out.push(msg),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, collected = out.len(), "frame source error");
                    break;
                }
            }
        }
        out
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn try_recv(&mut self) -> DoaResult<Option<Vec<u8>>> {
        (**self).try_recv()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn try_recv(&mut self) -> DoaResult<Option<Vec<u8>>> {
        (**self).try_recv()
    }
}
