//! MUSIC DoA estimator
//!
//! Ties the pipeline stages together behind two operations driven by the
//! host's timer:
//!
//! - [`MusicEstimator::ingest`]: drain whatever the source has queued and
//!   replace the CSI buffer (non-blocking)
//! - [`MusicEstimator::refresh`]: recompute the spatial spectrum from the
//!   current buffer
//!
//! ```text
//!  FrameSource ─drain─▶ FrameAccumulator ──antenna change──▶ SteeringVectorBank
//!                              │                                    │
//!                        CsiBuffer                                  │
//!                              ▼                                    ▼
//!            CovarianceEstimator ─▶ SubspaceSeparator ─▶ SpectrumSynthesizer ─▶ SpatialSpectrum
//! ```
//!
//! Both operations take `&mut self` and are meant to run on one thread. Hosts
//! that ingest and refresh from different threads use [`SharedEstimator`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use doa_core::{ChannelSource, CsiFrame, DoaConfig, HeaderLayout, MusicEstimator};
//! use doa_core::types::CsiSample;
//!
//! let (tx, rx) = mpsc::channel();
//! let mut source = ChannelSource::new(rx);
//! let mut estimator = MusicEstimator::new(&DoaConfig::default());
//!
//! // Two antennas, broadside source: both channels in phase.
//! let frame = CsiFrame::new(1, 2, 4, vec![CsiSample::new(1.0, 0.0); 8]).unwrap();
//! tx.send(frame.encode(HeaderLayout::Batched).unwrap()).unwrap();
//!
//! assert!(estimator.ingest(&mut source));
//! let spectrum = estimator.refresh().unwrap();
//! let (angle, _) = spectrum.peak().unwrap();
//! assert!(angle.abs() < 1.0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, warn};

use crate::accumulator::{FrameAccumulator, IngestReport};
use crate::config::DoaConfig;
use crate::covariance::CovarianceEstimator;
use crate::frame::FrameDecoder;
use crate::observe::Metrics;
use crate::spectrum::{DisplayBounds, SpatialSpectrum, SpectrumSynthesizer};
use crate::steering::{AngleGrid, SteeringVectorBank};
use crate::subspace::SubspaceSeparator;
use crate::transport::FrameSource;
use crate::types::{DoaError, DoaResult};

/// Stateful MUSIC estimator over a stream of CSI frames.
#[derive(Debug)]
pub struct MusicEstimator {
    accumulator: FrameAccumulator,
    steering: SteeringVectorBank,
    angles_deg: Vec<f64>,
    covariance: CovarianceEstimator,
    separator: SubspaceSeparator,
    synthesizer: SpectrumSynthesizer,
    bounds: DisplayBounds,
    last_spectrum: Option<SpatialSpectrum>,
    drain_limit: usize,
    metrics: Arc<Metrics>,
}

impl MusicEstimator {
    pub fn new(config: &DoaConfig) -> Self {
        Self::with_metrics(config, Arc::new(Metrics::new()))
    }

    /// Create an estimator reporting into an existing metrics registry.
    pub fn with_metrics(config: &DoaConfig, metrics: Arc<Metrics>) -> Self {
        let grid = AngleGrid::new(config.scan.angle_count);
        let angles_deg = grid.degrees();
        Self {
            accumulator: FrameAccumulator::new(
                FrameDecoder::new(config.frames.header_layout),
                config.frames.max_antennas,
            ),
            // Sized on the first committed batch.
            steering: SteeringVectorBank::new(grid, 0),
            angles_deg,
            covariance: CovarianceEstimator,
            separator: SubspaceSeparator::new(
                config.subspace.max_iterations,
                config.subspace.tolerance,
            ),
            synthesizer: SpectrumSynthesizer,
            bounds: DisplayBounds::default(),
            last_spectrum: None,
            drain_limit: config.refresh.drain_limit.max(1),
            metrics,
        }
    }

    /// Drain `source` and merge what arrived.
    ///
    /// Returns `true` when the buffer was replaced. Never blocks.
    pub fn ingest<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> bool {
        let messages = source.drain(self.drain_limit);
        if messages.is_empty() {
            return false;
        }
        self.ingest_batch(messages).committed
    }

    /// Merge an explicit batch of raw messages.
    pub fn ingest_batch<I>(&mut self, messages: I) -> IngestReport
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let report = self.accumulator.ingest_batch(messages);

        let m = &self.metrics;
        m.frames_received.inc_by(report.received as u64);
        m.frames_decoded.inc_by(report.decoded as u64);
        m.frames_empty.inc_by(report.empty as u64);
        m.frames_superseded.inc_by(report.superseded as u64);
        for err in &report.errors {
            m.record_drop(err);
        }

        if let Some(change) = report.antenna_change {
            m.antenna_changes.inc();
            m.antenna_count.set(change.current as i64);
            self.steering.ensure(change.current);
        }
        if report.committed {
            m.batches_committed.inc();
            let measurements = self.buffered_measurements();
            m.buffered_measurements.set(measurements as i64);
        }

        report
    }

    /// Recompute the spectrum from the current buffer.
    ///
    /// Fails with [`DoaError::NoData`] before the first committed batch and
    /// with [`DoaError::EigenDecomposition`] when the solver gives up. The
    /// last good spectrum and the display bounds are untouched on failure.
    pub fn try_refresh(&mut self) -> DoaResult<SpatialSpectrum> {
        let start = Instant::now();

        let r = self
            .accumulator
            .buffer()
            .and_then(|buffer| self.covariance.estimate(buffer))
            .ok_or(DoaError::NoData)?;
        let subspaces = self.separator.separate(&r)?;

        let spectrum = self.synthesizer.synthesize(
            &self.angles_deg,
            self.steering.matrix(),
            &subspaces.noise,
            &mut self.bounds,
        );

        let elapsed_us = start.elapsed().as_secs_f64() * 1e6;
        self.metrics.refreshes.inc();
        self.metrics.refresh_latency_us.observe(elapsed_us);
        debug!(
            antennas = self.steering.antennas(),
            elapsed_us,
            max_bound = spectrum.bounds.max,
            "spectrum refreshed"
        );

        self.last_spectrum = Some(spectrum.clone());
        Ok(spectrum)
    }

    /// [`try_refresh`](Self::try_refresh) with failures folded into `None`.
    ///
    /// A missing buffer is silent; solver failures are logged and counted.
    pub fn refresh(&mut self) -> Option<SpatialSpectrum> {
        match self.try_refresh() {
            Ok(spectrum) => Some(spectrum),
            Err(DoaError::NoData) => {
                self.metrics.refreshes_no_data.inc();
                None
            }
            Err(e) => {
                self.metrics.eigen_failures.inc();
                warn!(error = %e, "refresh failed, keeping last spectrum");
                None
            }
        }
    }

    /// Scan angles in degrees, fixed for the estimator's lifetime.
    pub fn angles_deg(&self) -> &[f64] {
        &self.angles_deg
    }

    pub fn antenna_count(&self) -> Option<usize> {
        self.accumulator.antenna_count()
    }

    pub fn buffered_measurements(&self) -> usize {
        self.accumulator.buffer().map_or(0, |b| b.measurements())
    }

    /// Most recent successful refresh.
    pub fn last_spectrum(&self) -> Option<&SpatialSpectrum> {
        self.last_spectrum.as_ref()
    }

    pub fn bounds(&self) -> DisplayBounds {
        self.bounds
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn steering(&self) -> &SteeringVectorBank {
        &self.steering
    }
}

impl Default for MusicEstimator {
    fn default() -> Self {
        Self::new(&DoaConfig::default())
    }
}

/// Mutex-protected estimator handle for split producer/consumer threads.
///
/// Buffer replacement and steering rebuilds happen under the same lock as
/// refreshes, so a refresh never sees a half-updated state.
#[derive(Debug, Clone)]
pub struct SharedEstimator {
    inner: Arc<Mutex<MusicEstimator>>,
    metrics: Arc<Metrics>,
}

impl SharedEstimator {
    pub fn new(estimator: MusicEstimator) -> Self {
        let metrics = Arc::clone(estimator.metrics());
        Self {
            inner: Arc::new(Mutex::new(estimator)),
            metrics,
        }
    }

    /// Lock the estimator. A poisoned lock is recovered since every
    /// operation leaves the estimator consistent between statements.
    pub fn lock(&self) -> MutexGuard<'_, MusicEstimator> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ingest<S: FrameSource + ?Sized>(&self, source: &mut S) -> bool {
        // Drain outside the lock so a slow source never stalls refreshes.
        let limit = self.lock().drain_limit;
        let messages = source.drain(limit);
        if messages.is_empty() {
            return false;
        }
        self.lock().ingest_batch(messages).committed
    }

    pub fn ingest_batch<I>(&self, messages: I) -> IngestReport
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        self.lock().ingest_batch(messages)
    }

    pub fn refresh(&self) -> Option<SpatialSpectrum> {
        self.lock().refresh()
    }

    /// Metrics are readable without taking the estimator lock.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl From<MusicEstimator> for SharedEstimator {
    fn from(estimator: MusicEstimator) -> Self {
        Self::new(estimator)
    }
}
