//! Signal / noise subspace separation
//!
//! The covariance matrix is decomposed with a general complex eigensolver
//! (complex Schur form followed by triangular back-substitution), so small
//! asymmetries left by floating-point accumulation do not break it. Eigenpairs
//! are ordered by the real part of the eigenvalue, largest first; ties keep
//! their original order.
//!
//! A single dominant source is assumed: the first eigenvector spans the
//! signal subspace and the remaining `A − 1` span the noise subspace.
//!
//! ## Algorithm
//!
//! 1. `R / s = Q·T·Qᴴ` with `s = max|R[i,j]|` (complex Schur, `T` upper triangular)
//! 2. `λ_k = s·T[k, k]`
//! 3. Solve `(T − λ_k·I)·y_k = 0` with `y_k[k] = 1`, `y_k[j > k] = 0`
//! 4. `v_k = Q·y_k / ‖Q·y_k‖`
//!
//! The zero matrix short-circuits to zero eigenvalues with the identity basis.

use nalgebra::{DMatrix, Schur};
use ndarray::{Array1, Array2};

use crate::accumulator::MIN_ANTENNAS;
use crate::covariance::CovarianceMatrix;
use crate::types::{Complex, DoaError, DoaResult};

/// Eigenvalues and unit-norm eigenvectors (one column per eigenvalue).
#[derive(Debug, Clone)]
pub struct EigenDecomposition {
    pub values: Vec<Complex>,
    pub vectors: Array2<Complex>,
}

impl EigenDecomposition {
    /// Indices of the eigenpairs sorted by decreasing real part (stable).
    pub fn descending_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[b].re.total_cmp(&self.values[a].re));
        order
    }
}

/// Result of splitting the eigenspace.
#[derive(Debug, Clone)]
pub struct Subspaces {
    /// Eigenvalues sorted by decreasing real part
    pub eigenvalues: Vec<Complex>,
    /// Eigenvector of the largest eigenvalue
    pub signal: Array1<Complex>,
    /// Remaining eigenvectors as columns, `(A × (A − 1))`
    pub noise: Array2<Complex>,
}

/// Eigendecomposition and rank-1 signal/noise split.
#[derive(Debug, Clone, Copy)]
pub struct SubspaceSeparator {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for SubspaceSeparator {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: f64::EPSILON,
        }
    }
}

impl SubspaceSeparator {
    /// `max_iterations == 0` lets the Schur iteration run until convergence.
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    /// Full eigendecomposition of a square complex matrix.
    pub fn decompose(&self, r: &CovarianceMatrix) -> DoaResult<EigenDecomposition> {
        let n = r.nrows();
        if n < MIN_ANTENNAS || r.ncols() != n {
            return Err(DoaError::EigenDecomposition(format!(
                "need a square matrix of at least {MIN_ANTENNAS}x{MIN_ANTENNAS}, got {}x{}",
                r.nrows(),
                r.ncols()
            )));
        }

        // Solve on R / max|R| so the convergence tolerance is scale independent.
        let scale = r.iter().map(|v| v.norm()).fold(0.0_f64, f64::max);
        if r.iter().any(|v| !v.is_finite()) {
            return Err(DoaError::EigenDecomposition(
                "covariance matrix has non-finite entries".into(),
            ));
        }
        if scale == 0.0 {
            return Ok(EigenDecomposition {
                values: vec![Complex::new(0.0, 0.0); n],
                vectors: Array2::eye(n),
            });
        }

        let m = DMatrix::from_fn(n, n, |i, j| r[[i, j]] / scale);
        let schur = Schur::try_new(m, self.tolerance, self.max_iterations).ok_or_else(|| {
            DoaError::EigenDecomposition(format!(
                "Schur iteration did not converge within {} iterations",
                self.max_iterations
            ))
        })?;
        let (q, t) = schur.unpack();

        let values: Vec<Complex> = (0..n).map(|k| t[(k, k)] * scale).collect();
        let mut v = q * triangular_eigenvectors(&t);

        for k in 0..n {
            let norm = (0..n).map(|i| v[(i, k)].norm_sqr()).sum::<f64>().sqrt();
            if norm > 0.0 {
                for i in 0..n {
                    v[(i, k)] /= norm;
                }
            }
        }

        Ok(EigenDecomposition {
            values,
            vectors: Array2::from_shape_fn((n, n), |(i, j)| v[(i, j)]),
        })
    }

    /// Decompose and split into the signal eigenvector and the noise subspace.
    pub fn separate(&self, r: &CovarianceMatrix) -> DoaResult<Subspaces> {
        let eig = self.decompose(r)?;
        let order = eig.descending_order();
        let n = order.len();

        let signal = eig.vectors.column(order[0]).to_owned();
        let noise = Array2::from_shape_fn((n, n - 1), |(i, j)| eig.vectors[[i, order[j + 1]]]);
        let eigenvalues = order.iter().map(|&k| eig.values[k]).collect();

        Ok(Subspaces {
            eigenvalues,
            signal,
            noise,
        })
    }
}

/// Eigenvectors of an upper-triangular matrix by back-substitution.
///
/// Column `k` solves `(T − T[k,k]·I)·y = 0` with `y[k] = 1`. Near-zero pivots
/// are replaced by `ε·‖T‖` so clustered eigenvalues stay finite.
fn triangular_eigenvectors(t: &DMatrix<Complex>) -> DMatrix<Complex> {
    let n = t.nrows();
    let scale = t.iter().map(|v| v.norm()).fold(0.0_f64, f64::max);
    let small = (f64::EPSILON * scale).max(f64::MIN_POSITIVE);

    let mut y = DMatrix::from_element(n, n, Complex::new(0.0, 0.0));
    for k in 0..n {
        let lambda = t[(k, k)];
        y[(k, k)] = Complex::new(1.0, 0.0);
        for i in (0..k).rev() {
            let mut acc = Complex::new(0.0, 0.0);
            for j in (i + 1)..=k {
                acc += t[(i, j)] * y[(j, k)];
            }
            let mut pivot = t[(i, i)] - lambda;
            if pivot.norm() < small {
                pivot = Complex::new(small, 0.0);
            }
            y[(i, k)] = -acc / pivot;
        }
    }
    y
}
