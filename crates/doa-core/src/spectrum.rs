//! MUSIC pseudo-spectrum synthesis
//!
//! For every scan angle `θ_k` the steering vector is projected onto the noise
//! subspace. Directions that carry the source are (nearly) orthogonal to the
//! noise subspace, so the projection norm collapses and its reciprocal peaks:
//!
//! ```text
//! P(θ_k) = 1 / ‖Qnᴴ · a(θ_k)‖          (linear)
//! P_dB   = 20·log10(P)
//! ```
//!
//! ## Display bounds
//!
//! `min = min(P_dB) − 1` is recomputed every refresh. `max` only ever grows so
//! a plot's vertical axis does not jump around between refreshes.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::Complex;

/// Smallest projection norm used before inversion.
///
/// An exact null therefore produces `20·log10(1e12) = 240` dB instead of `inf`.
pub const NORM_FLOOR: f64 = 1e-12;

/// Margin applied below the spectrum minimum.
pub const MIN_BOUND_MARGIN_DB: f64 = 1.0;

/// Running axis limits for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for DisplayBounds {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl DisplayBounds {
    /// Fold a new spectrum into the bounds.
    ///
    /// Non-finite values are ignored so a single NaN cannot poison the
    /// running maximum.
    pub fn update(&mut self, power_db: &[f64]) {
        let finite = power_db.iter().copied().filter(|v| v.is_finite());
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if lo.is_finite() {
            self.min = lo - MIN_BOUND_MARGIN_DB;
        }
        self.max = self.max.max(hi);
    }

    /// True once at least one finite spectrum has been folded in.
    pub fn is_set(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// One refresh worth of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialSpectrum {
    /// `(angle_deg, power_db)` in scan order
    pub points: Vec<(f64, f64)>,
    pub bounds: DisplayBounds,
}

impl SpatialSpectrum {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn angles_deg(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.0)
    }

    pub fn power_db(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.1)
    }

    /// Global maximum. The first point wins on ties.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.points
            .iter()
            .copied()
            .filter(|p| !p.1.is_nan())
            .fold(None, |best: Option<(f64, f64)>, p| match best {
                Some(b) if b.1 >= p.1 => Some(b),
                _ => Some(p),
            })
    }

    /// Up to `n` local maxima, strongest first.
    ///
    /// A point is a local maximum when it is strictly greater than its left
    /// neighbour and not smaller than its right one; grid edges count when
    /// they beat their single neighbour.
    pub fn peaks(&self, n: usize) -> Vec<(f64, f64)> {
        let p = &self.points;
        let mut found: Vec<(f64, f64)> = Vec::new();
        for i in 0..p.len() {
            let v = p[i].1;
            if v.is_nan() {
                continue;
            }
            let left_ok = i == 0 || v > p[i - 1].1;
            let right_ok = i + 1 == p.len() || v >= p[i + 1].1;
            if left_ok && right_ok {
                found.push(p[i]);
            }
        }
        found.sort_by(|a, b| b.1.total_cmp(&a.1));
        found.truncate(n);
        found
    }
}

/// Steering-matrix projection onto the noise subspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectrumSynthesizer;

impl SpectrumSynthesizer {
    /// Linear pseudo-spectrum, one value per steering row.
    ///
    /// `steering` is `(N_angles × A)`, `noise` is `(A × (A − 1))`.
    pub fn pseudo_spectrum(&self, steering: &Array2<Complex>, noise: &Array2<Complex>) -> Vec<f64> {
        debug_assert_eq!(steering.ncols(), noise.nrows());
        // Row k of `proj` is (Qnᴴ·a_k)ᵀ.
        let proj = steering.dot(&noise.mapv(|v| v.conj()));
        proj.rows()
            .into_iter()
            .map(|row| {
                let norm = row.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
                1.0 / norm.max(NORM_FLOOR)
            })
            .collect()
    }

    /// Linear power to dB: `20·log10(p)`.
    pub fn to_db(linear: &[f64]) -> Vec<f64> {
        linear.iter().map(|p| 20.0 * p.log10()).collect()
    }

    /// Full synthesis: projection, dB conversion, bounds update.
    pub fn synthesize(
        &self,
        angles_deg: &[f64],
        steering: &Array2<Complex>,
        noise: &Array2<Complex>,
        bounds: &mut DisplayBounds,
    ) -> SpatialSpectrum {
        let power_db = Self::to_db(&self.pseudo_spectrum(steering, noise));
        bounds.update(&power_db);
        SpatialSpectrum {
            points: angles_deg.iter().copied().zip(power_db).collect(),
            bounds: *bounds,
        }
    }
}
