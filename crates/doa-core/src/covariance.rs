//! Spatial covariance estimation
//!
//! Every `(measurement, group, row, subcarrier)` combination of the buffer is
//! one observation `x` of the per-antenna response. The estimate is the plain
//! sum of outer products:
//!
//! ```text
//! R[i, j] = Σ_{d,g,r,s} csi[d,g,r,i,s] · conj(csi[d,g,r,j,s])
//! ```
//!
//! No division by the observation count is applied. Scaling shifts the
//! absolute dB level of the spectrum but not the location of its peaks.

use ndarray::{Array2, Axis};

use crate::accumulator::CsiBuffer;
use crate::types::Complex;

/// `(A × A)` Hermitian covariance matrix
pub type CovarianceMatrix = Array2<Complex>;

/// Sum-of-outer-products covariance estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CovarianceEstimator;

impl CovarianceEstimator {
    /// Estimate the covariance of `buffer`.
    ///
    /// Returns `None` when the buffer holds no observations, in which case
    /// the caller skips the refresh.
    pub fn estimate(&self, buffer: &CsiBuffer) -> Option<CovarianceMatrix> {
        if buffer.is_empty() {
            return None;
        }

        let antennas = buffer.antennas();
        let mut r = CovarianceMatrix::zeros((antennas, antennas));
        let mut x = vec![Complex::new(0.0, 0.0); antennas];

        // Each lane along the antenna axis is one observation vector.
        for lane in buffer.as_array().lanes(Axis(3)) {
            for (xi, s) in x.iter_mut().zip(lane.iter()) {
                *xi = Complex::new(s.re as f64, s.im as f64);
            }
            for i in 0..antennas {
                for j in 0..antennas {
                    r[[i, j]] += x[i] * x[j].conj();
                }
            }
        }

        Some(r)
    }

    /// Number of observation vectors that feed the estimate.
    pub fn observations(&self, buffer: &CsiBuffer) -> usize {
        buffer.measurements() * buffer.groups() * buffer.rows() * buffer.subcarriers()
    }
}
