//! # Metrics
//!
//! Lock-free counters for the ingest/refresh pipeline, exportable in
//! Prometheus text format:
//!
//! - **Counters**: frames received/decoded/dropped, batches, refreshes
//! - **Gauges**: antenna count, buffered measurements
//! - **Histograms**: refresh latency
//!
//! Serving the text over HTTP is left to the host.
//!
//! ## Example
//!
//! ```rust
//! use doa_core::observe::Metrics;
//!
//! let metrics = Metrics::new();
//! metrics.frames_received.inc_by(3);
//! metrics.refresh_latency_us.observe(420.0);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.frames_received, 3);
//! assert!(metrics.to_prometheus().contains("doa_frames_received_total 3"));
//! ```

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::types::DoaError;

/// Monotonic atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc(&self) {
        self.inc_by(1);
    }

    #[inline]
    pub fn inc_by(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self, v: i64) {
        self.value.store(v, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram.
///
/// The sum is kept in thousandths so it fits an atomic integer.
#[derive(Debug)]
pub struct Histogram {
    boundaries: Vec<f64>,
    /// `boundaries.len() + 1` buckets, the last one catches overflow
    buckets: Vec<AtomicU64>,
    sum_milli: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(boundaries: Vec<f64>) -> Self {
        let n = boundaries.len() + 1;
        Self {
            boundaries,
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
            sum_milli: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Buckets suited to refresh latencies in microseconds.
    pub fn latency_us() -> Self {
        Self::new(vec![
            10.0, 50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 50_000.0,
        ])
    }

    pub fn observe(&self, value: f64) {
        let idx = self
            .boundaries
            .iter()
            .position(|&b| value < b)
            .unwrap_or(self.boundaries.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.sum_milli
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum_milli.load(Ordering::Relaxed) as f64 / 1000.0
    }

    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::latency_us()
    }
}

/// Estimator pipeline metrics.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingest
    /// Raw messages handed to the accumulator
    pub frames_received: Counter,
    /// Frames that made it into a batch
    pub frames_decoded: Counter,
    /// Header/payload length mismatches
    pub frames_malformed: Counter,
    /// Element count inconsistent with the declared shape
    pub frames_reshape: Counter,
    /// Frames carrying NaN or infinite samples
    pub frames_non_finite: Counter,
    /// Antenna count outside the accepted range
    pub frames_antenna_range: Counter,
    /// Frames discarded by a newer shape later in the same batch
    pub frames_superseded: Counter,
    /// Frames without observations
    pub frames_empty: Counter,
    /// Batches that replaced the buffer
    pub batches_committed: Counter,
    pub antenna_changes: Counter,

    // Refresh
    pub refreshes: Counter,
    /// Refreshes skipped because no buffer was available
    pub refreshes_no_data: Counter,
    pub eigen_failures: Counter,

    // State
    pub antenna_count: Gauge,
    pub buffered_measurements: Gauge,

    /// Wall time of a successful refresh
    pub refresh_latency_us: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a dropped frame under its reason.
    pub fn record_drop(&self, err: &DoaError) {
        match err {
            DoaError::MalformedFrame { .. } => self.frames_malformed.inc(),
            DoaError::ReshapeMismatch { .. } => self.frames_reshape.inc(),
            DoaError::NonFiniteSample { .. } => self.frames_non_finite.inc(),
            DoaError::AntennaCountOutOfRange { .. } => self.frames_antenna_range.inc(),
            // Only frame-level errors reach this point in practice.
            _ => self.frames_malformed.inc(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.get(),
            frames_decoded: self.frames_decoded.get(),
            frames_malformed: self.frames_malformed.get(),
            frames_reshape: self.frames_reshape.get(),
            frames_non_finite: self.frames_non_finite.get(),
            frames_antenna_range: self.frames_antenna_range.get(),
            frames_superseded: self.frames_superseded.get(),
            frames_empty: self.frames_empty.get(),
            batches_committed: self.batches_committed.get(),
            antenna_changes: self.antenna_changes.get(),
            refreshes: self.refreshes.get(),
            refreshes_no_data: self.refreshes_no_data.get(),
            eigen_failures: self.eigen_failures.get(),
            antenna_count: self.antenna_count.get(),
            buffered_measurements: self.buffered_measurements.get(),
            refresh_latency_count: self.refresh_latency_us.count(),
            refresh_latency_sum_us: self.refresh_latency_us.sum(),
        }
    }

    /// Reset counters. Gauges keep describing the current state.
    pub fn reset(&self) {
        for c in [
            &self.frames_received,
            &self.frames_decoded,
            &self.frames_malformed,
            &self.frames_reshape,
            &self.frames_non_finite,
            &self.frames_antenna_range,
            &self.frames_superseded,
            &self.frames_empty,
            &self.batches_committed,
            &self.antenna_changes,
            &self.refreshes,
            &self.refreshes_no_data,
            &self.eigen_failures,
        ] {
            c.reset();
        }
    }

    /// Prometheus text exposition.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut out = String::new();

        let counters = [
            ("frames_received_total", "CSI messages received", s.frames_received),
            ("frames_decoded_total", "CSI frames accepted into a batch", s.frames_decoded),
            ("batches_committed_total", "Batches that replaced the CSI buffer", s.batches_committed),
            ("antenna_changes_total", "Antenna count transitions", s.antenna_changes),
            ("refreshes_total", "Spectrum refreshes computed", s.refreshes),
            ("refreshes_no_data_total", "Refreshes skipped without data", s.refreshes_no_data),
            ("eigen_failures_total", "Eigendecomposition failures", s.eigen_failures),
        ];
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP doa_{name} {help}");
            let _ = writeln!(out, "# TYPE doa_{name} counter");
            let _ = writeln!(out, "doa_{name} {value}");
        }

        let _ = writeln!(out, "# HELP doa_frames_dropped_total CSI frames dropped by reason");
        let _ = writeln!(out, "# TYPE doa_frames_dropped_total counter");
        for (reason, value) in [
            ("malformed", s.frames_malformed),
            ("reshape", s.frames_reshape),
            ("non_finite", s.frames_non_finite),
            ("antenna_range", s.frames_antenna_range),
            ("superseded", s.frames_superseded),
            ("empty", s.frames_empty),
        ] {
            let _ = writeln!(out, "doa_frames_dropped_total{{reason=\"{reason}\"}} {value}");
        }

        for (name, help, value) in [
            ("antenna_count", "Antennas in the current buffer", s.antenna_count),
            ("buffered_measurements", "Measurements in the current buffer", s.buffered_measurements),
        ] {
            let _ = writeln!(out, "# HELP doa_{name} {help}");
            let _ = writeln!(out, "# TYPE doa_{name} gauge");
            let _ = writeln!(out, "doa_{name} {value}");
        }

        let h = &self.refresh_latency_us;
        let _ = writeln!(out, "# HELP doa_refresh_latency_us Spectrum refresh latency");
        let _ = writeln!(out, "# TYPE doa_refresh_latency_us histogram");
        let mut cumulative = 0;
        for (bound, count) in h.boundaries().iter().zip(h.bucket_counts()) {
            cumulative += count;
            let _ = writeln!(out, "doa_refresh_latency_us_bucket{{le=\"{bound}\"}} {cumulative}");
        }
        let _ = writeln!(out, "doa_refresh_latency_us_bucket{{le=\"+Inf\"}} {}", h.count());
        let _ = writeln!(out, "doa_refresh_latency_us_sum {}", h.sum());
        let _ = writeln!(out, "doa_refresh_latency_us_count {}", h.count());

        out
    }
}

/// Point-in-time copy of [`Metrics`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub frames_malformed: u64,
    pub frames_reshape: u64,
    pub frames_non_finite: u64,
    pub frames_antenna_range: u64,
    pub frames_superseded: u64,
    pub frames_empty: u64,
    pub batches_committed: u64,
    pub antenna_changes: u64,
    pub refreshes: u64,
    pub refreshes_no_data: u64,
    pub eigen_failures: u64,
    pub antenna_count: i64,
    pub buffered_measurements: i64,
    pub refresh_latency_count: u64,
    pub refresh_latency_sum_us: f64,
}

impl MetricsSnapshot {
    pub fn frames_dropped(&self) -> u64 {
        self.frames_malformed
            + self.frames_reshape
            + self.frames_non_finite
            + self.frames_antenna_range
            + self.frames_superseded
            + self.frames_empty
    }

    pub fn avg_refresh_latency_us(&self) -> f64 {
        if self.refresh_latency_count == 0 {
            0.0
        } else {
            self.refresh_latency_sum_us / self.refresh_latency_count as f64
        }
    }
}
