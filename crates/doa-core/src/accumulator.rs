//! Frame accumulation
//!
//! Holds the working set of CSI snapshots used for the next covariance
//! estimate. Every successful batch *replaces* the buffer; nothing is merged
//! into the previous one.
//!
//! ## Batch semantics
//!
//! ```text
//!  messages ─▶ decode ─▶ validate ─▶ collect ─┬─▶ concat(axis 0) ─▶ commit
//!     │          ✗          ✗                  │
//!     └── drop single frame, keep going        └─ nothing collected: keep old buffer
//! ```
//!
//! - A batch that yields no usable frame leaves the previous buffer in place,
//!   so a corrupt or empty tick never blanks the display.
//! - Frames carrying NaN or infinite samples are dropped before they can
//!   reach the buffer.
//! - Frames inside one batch must share `(antennas, subcarriers)`. When the
//!   shape changes mid-batch the newer shape wins and earlier frames of the
//!   same batch are discarded.
//! - A committed antenna count different from the stored one is reported as
//!   an [`AntennaChange`] so the steering matrix can be rebuilt.

use ndarray::{concatenate, Array5, Axis};
use tracing::{debug, info, warn};

use crate::frame::{CsiFrame, FrameDecoder};
use crate::types::{CsiSample, DoaError, DoaResult};

/// Smallest antenna count MUSIC can work with (one signal + one noise vector).
pub const MIN_ANTENNAS: usize = 2;

/// Accumulated CSI tensor of shape `(measurements, groups, rows, antennas, subcarriers)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CsiBuffer {
    data: Array5<CsiSample>,
}

impl CsiBuffer {
    /// Lift a decoded frame into the 5-D layout with one group and one row.
    pub fn from_frame(frame: CsiFrame) -> DoaResult<Self> {
        let shape = (
            frame.measurements(),
            1,
            1,
            frame.channels(),
            frame.samples_per_channel(),
        );
        let expected = shape.0 * shape.3 * shape.4;
        let samples = frame.into_samples();
        let actual = samples.len();
        let data = Array5::from_shape_vec(shape, samples)
            .map_err(|_| DoaError::ReshapeMismatch { expected, actual })?;
        Ok(Self { data })
    }

    /// Wrap an existing tensor.
    pub fn from_array(data: Array5<CsiSample>) -> Self {
        Self { data }
    }

    /// Concatenate buffers along the measurement axis.
    pub fn concat(parts: &[CsiBuffer]) -> DoaResult<Self> {
        let views: Vec<_> = parts.iter().map(|p| p.data.view()).collect();
        let actual: usize = parts.iter().map(|p| p.data.len()).sum();
        let data = concatenate(Axis(0), &views).map_err(|_| DoaError::ReshapeMismatch {
            expected: parts.first().map_or(0, |p| p.data.len()) * parts.len(),
            actual,
        })?;
        Ok(Self { data })
    }

    pub fn measurements(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn groups(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn rows(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn antennas(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn subcarriers(&self) -> usize {
        self.data.shape()[4]
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Underlying tensor.
    pub fn as_array(&self) -> &Array5<CsiSample> {
        &self.data
    }
}

/// Antenna-count transition observed while committing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaChange {
    /// Count before the batch (`None` on the very first commit).
    pub previous: Option<usize>,
    pub current: usize,
}

/// Outcome of one ingest pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// Messages seen in the batch
    pub received: usize,
    /// Frames that decoded, validated and are part of the collected batch
    pub decoded: usize,
    /// Valid frames discarded because a later frame of the batch changed shape
    pub superseded: usize,
    /// Per-frame failures, in arrival order
    pub errors: Vec<DoaError>,
    /// Frames that decoded but carried no observations
    pub empty: usize,
    /// True when a new buffer replaced the previous one
    pub committed: bool,
    /// Set when the committed antenna count differs from the stored one
    pub antenna_change: Option<AntennaChange>,
}

impl IngestReport {
    /// Frames that did not make it into the buffer.
    pub fn dropped(&self) -> usize {
        self.errors.len() + self.empty + self.superseded
    }
}

/// Owner of the current [`CsiBuffer`].
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    decoder: FrameDecoder,
    max_antennas: usize,
    buffer: Option<CsiBuffer>,
    antenna_count: Option<usize>,
}

impl FrameAccumulator {
    /// Create an accumulator accepting between [`MIN_ANTENNAS`] and
    /// `max_antennas` channels per frame.
    pub fn new(decoder: FrameDecoder, max_antennas: usize) -> Self {
        Self {
            decoder,
            max_antennas: max_antennas.max(MIN_ANTENNAS),
            buffer: None,
            antenna_count: None,
        }
    }

    /// Current buffer, if any batch has been committed.
    pub fn buffer(&self) -> Option<&CsiBuffer> {
        self.buffer.as_ref()
    }

    /// Antenna count of the current buffer.
    pub fn antenna_count(&self) -> Option<usize> {
        self.antenna_count
    }

    pub fn max_antennas(&self) -> usize {
        self.max_antennas
    }

    /// Decode and merge one batch of raw messages.
    ///
    /// Returns a report describing what happened; the buffer is replaced
    /// only if at least one frame survived.
    pub fn ingest_batch<I>(&mut self, messages: I) -> IngestReport
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut report = IngestReport::default();
        let mut parts: Vec<CsiBuffer> = Vec::new();
        let mut batch_shape: Option<(usize, usize)> = None;

        for msg in messages {
            report.received += 1;
            let frame = match self.decoder.decode(msg.as_ref()) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(error = %e, len = msg.as_ref().len(), "dropping CSI frame");
                    report.errors.push(e);
                    continue;
                }
            };

            if frame.is_empty() {
                debug!(
                    measurements = frame.measurements(),
                    channels = frame.channels(),
                    subcarriers = frame.samples_per_channel(),
                    "skipping frame without observations"
                );
                report.empty += 1;
                continue;
            }

            if let Some(index) = frame.samples().iter().position(|s| !s.is_finite()) {
                let e = DoaError::NonFiniteSample { index };
                warn!(error = %e, "dropping CSI frame");
                report.errors.push(e);
                continue;
            }

            if let Err(e) = self.check_antennas(frame.channels()) {
                warn!(error = %e, "dropping CSI frame");
                report.errors.push(e);
                continue;
            }

            let shape = (frame.channels(), frame.samples_per_channel());
            let part = match CsiBuffer::from_frame(frame) {
                Ok(part) => part,
                Err(e) => {
                    warn!(error = %e, "dropping CSI frame");
                    report.errors.push(e);
                    continue;
                }
            };

            if batch_shape.is_some_and(|s| s != shape) {
                debug!(
                    discarded = parts.len(),
                    antennas = shape.0,
                    subcarriers = shape.1,
                    "frame shape changed within batch"
                );
                report.decoded -= parts.len();
                report.superseded += parts.len();
                parts.clear();
            }
            batch_shape = Some(shape);
            parts.push(part);
            report.decoded += 1;
        }

        if parts.is_empty() {
            if report.received > 0 {
                debug!(
                    received = report.received,
                    "no usable frames in batch, keeping previous buffer"
                );
            }
            return report;
        }

        let buffer = if parts.len() == 1 {
            parts.pop()
        } else {
            match CsiBuffer::concat(&parts) {
                Ok(buffer) => Some(buffer),
                Err(e) => {
                    warn!(error = %e, "failed to concatenate batch, keeping previous buffer");
                    report.errors.push(e);
                    None
                }
            }
        };

        if let Some(buffer) = buffer {
            self.commit(buffer, &mut report);
        }
        report
    }

    fn check_antennas(&self, count: usize) -> DoaResult<()> {
        if (MIN_ANTENNAS..=self.max_antennas).contains(&count) {
            Ok(())
        } else {
            Err(DoaError::AntennaCountOutOfRange {
                count,
                min: MIN_ANTENNAS,
                max: self.max_antennas,
            })
        }
    }

    fn commit(&mut self, buffer: CsiBuffer, report: &mut IngestReport) {
        let antennas = buffer.antennas();
        if self.antenna_count != Some(antennas) {
            info!(
                previous = ?self.antenna_count,
                current = antennas,
                "antenna count changed"
            );
            report.antenna_change = Some(AntennaChange {
                previous: self.antenna_count,
                current: antennas,
            });
            self.antenna_count = Some(antennas);
        }

        debug!(
            measurements = buffer.measurements(),
            antennas,
            subcarriers = buffer.subcarriers(),
            "committed CSI buffer"
        );
        self.buffer = Some(buffer);
        report.committed = true;
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new(FrameDecoder::default(), 64)
    }
}
