//! Steering vectors for a uniform linear array
//!
//! For a plane wave arriving at angle θ (measured from broadside) on a ULA
//! with half-wavelength spacing, the phase at antenna `n` relative to antenna
//! 0 is `−π·sin(θ)·n`:
//!
//! ```text
//!         θ  ╲  plane wave
//!             ╲
//!   ──●────●────●────●──   antennas 0..A
//!     0    1    2    3      spacing λ/2
//! ```
//!
//! The bank caches the `(N_angles × A)` matrix and rebuilds it only when the
//! antenna count changes.

use ndarray::Array2;
use std::f64::consts::{FRAC_PI_2, PI};

use crate::types::Complex;

/// Coarse scan grid, one point per degree
pub const ANGLES_COARSE: usize = 180;

/// Fine scan grid, ten points per degree
pub const ANGLES_FINE: usize = 1800;

/// Fixed angular scan grid spanning −π/2..=π/2 (inclusive, evenly spaced).
#[derive(Debug, Clone, PartialEq)]
pub struct AngleGrid {
    radians: Vec<f64>,
}

impl AngleGrid {
    /// Create a grid with `count` points. At least two points are used.
    pub fn new(count: usize) -> Self {
        let count = count.max(2);
        let step = PI / (count - 1) as f64;
        let radians = (0..count)
            .map(|k| {
                if k == count - 1 {
                    FRAC_PI_2
                } else {
                    -FRAC_PI_2 + k as f64 * step
                }
            })
            .collect();
        Self { radians }
    }

    pub fn len(&self) -> usize {
        self.radians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radians.is_empty()
    }

    pub fn radians(&self) -> &[f64] {
        &self.radians
    }

    /// Grid in degrees, as exposed to the presentation layer.
    pub fn degrees(&self) -> Vec<f64> {
        self.radians.iter().map(|r| r.to_degrees()).collect()
    }

    /// Spacing between neighbouring grid points in degrees.
    pub fn step_deg(&self) -> f64 {
        180.0 / (self.len() - 1) as f64
    }
}

impl Default for AngleGrid {
    fn default() -> Self {
        Self::new(ANGLES_COARSE)
    }
}

/// Steering vector for one angle: `a[n] = exp(−iπ·sin(θ)·n)`.
pub fn steering_vector(angle_rad: f64, antennas: usize) -> Vec<Complex> {
    let phase_step = -PI * angle_rad.sin();
    (0..antennas)
        .map(|n| Complex::from_polar(1.0, phase_step * n as f64))
        .collect()
}

/// Cached steering matrix, one row per scan angle.
#[derive(Debug, Clone)]
pub struct SteeringVectorBank {
    grid: AngleGrid,
    antennas: usize,
    matrix: Array2<Complex>,
}

impl SteeringVectorBank {
    pub fn new(grid: AngleGrid, antennas: usize) -> Self {
        let matrix = Self::build(&grid, antennas);
        Self {
            grid,
            antennas,
            matrix,
        }
    }

    fn build(grid: &AngleGrid, antennas: usize) -> Array2<Complex> {
        let angles = grid.radians();
        Array2::from_shape_fn((angles.len(), antennas), |(k, n)| {
            Complex::from_polar(1.0, -PI * angles[k].sin() * n as f64)
        })
    }

    /// Make sure the matrix matches `antennas`, rebuilding if needed.
    ///
    /// Returns `true` when a rebuild happened.
    pub fn ensure(&mut self, antennas: usize) -> bool {
        if antennas == self.antennas {
            return false;
        }
        tracing::debug!(
            from = self.antennas,
            to = antennas,
            angles = self.grid.len(),
            "rebuilding steering matrix"
        );
        self.matrix = Self::build(&self.grid, antennas);
        self.antennas = antennas;
        true
    }

    pub fn antennas(&self) -> usize {
        self.antennas
    }

    pub fn grid(&self) -> &AngleGrid {
        &self.grid
    }

    /// `(N_angles × antennas)` steering matrix.
    pub fn matrix(&self) -> &Array2<Complex> {
        &self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_endpoints() {
        let grid = AngleGrid::new(ANGLES_COARSE);
        assert_eq!(grid.len(), 180);
        assert_eq!(grid.radians()[0], -FRAC_PI_2);
        assert_eq!(grid.radians()[179], FRAC_PI_2);

        let deg = grid.degrees();
        assert!((deg[0] + 90.0).abs() < 1e-12);
        assert!((deg[179] - 90.0).abs() < 1e-12);
        assert!((grid.step_deg() - 180.0 / 179.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_evenly_spaced() {
        let grid = AngleGrid::new(ANGLES_FINE);
        let r = grid.radians();
        let step = PI / 1799.0;
        for w in r.windows(2) {
            assert!((w[1] - w[0] - step).abs() < 1e-12);
        }
    }

    #[test]
    fn test_steering_broadside() {
        // θ = 0: all phases are zero
        for a in steering_vector(0.0, 4) {
            assert!((a.re - 1.0).abs() < 1e-12);
            assert!(a.im.abs() < 1e-12);
        }
    }

    #[test]
    fn test_steering_endfire() {
        // θ = 90°: phase advances by −π per antenna
        let sv = steering_vector(FRAC_PI_2, 3);
        assert!((sv[1].re + 1.0).abs() < 1e-12);
        assert!((sv[2].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bank_matches_vector() {
        let bank = SteeringVectorBank::new(AngleGrid::new(31), 5);
        assert_eq!(bank.matrix().shape(), &[31, 5]);
        for (k, &theta) in bank.grid().radians().iter().enumerate() {
            let sv = steering_vector(theta, 5);
            for n in 0..5 {
                assert!((bank.matrix()[[k, n]] - sv[n]).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_bank_rebuild_only_on_change() {
        let mut bank = SteeringVectorBank::new(AngleGrid::default(), 4);
        assert!(!bank.ensure(4));
        assert!(bank.ensure(8));
        assert_eq!(bank.matrix().shape(), &[180, 8]);
        assert_eq!(bank.antennas(), 8);
        assert!(!bank.ensure(8));
    }
}
