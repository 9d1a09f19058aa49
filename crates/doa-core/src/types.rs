//! Core types for CSI direction-of-arrival processing
//!
//! CSI arrives on the wire as single-precision complex values (two IEEE-754
//! `f32` per sample). All estimation math runs in double precision so that
//! summing many observations into the covariance matrix does not lose the
//! small eigenvalues that make up the noise subspace.
//!
//! ```text
//!  wire (cf32)            buffer (cf32)             math (cf64)
//!  ───────────▶ decode ──────────────▶ covariance ──────────────▶ eig ▶ spectrum
//! ```

use num_complex::{Complex32, Complex64};

/// Complex number type used for all estimation math
pub type Complex = Complex64;

/// A single CSI sample as carried on the wire and stored in the buffer
pub type CsiSample = Complex32;

/// Result type for DoA operations
pub type DoaResult<T> = Result<T, DoaError>;

/// Errors that can occur while decoding, accumulating or estimating
///
/// None of these are fatal to the pipeline: per-frame errors drop the single
/// frame and the remaining frames of the batch are still processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoaError {
    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },

    #[error("Reshape mismatch: declared {expected} elements, decoded {actual}")]
    ReshapeMismatch { expected: usize, actual: usize },

    #[error("Non-finite CSI sample at index {index}")]
    NonFiniteSample { index: usize },

    #[error("Antenna count {count} outside supported range {min}..={max}")]
    AntennaCountOutOfRange { count: usize, min: usize, max: usize },

    #[error("No CSI data accumulated")]
    NoData,

    #[error("Eigendecomposition failed: {0}")]
    EigenDecomposition(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl DoaError {
    /// Short machine-readable label, used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DoaError::MalformedFrame { .. } => "malformed",
            DoaError::ReshapeMismatch { .. } => "reshape",
            DoaError::NonFiniteSample { .. } => "non_finite",
            DoaError::AntennaCountOutOfRange { .. } => "antenna_range",
            DoaError::NoData => "no_data",
            DoaError::EigenDecomposition(_) => "eigen",
            DoaError::Transport(_) => "transport",
        }
    }
}

impl From<std::io::Error> for DoaError {
    fn from(e: std::io::Error) -> Self {
        DoaError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DoaError::MalformedFrame {
            expected: 44,
            actual: 40,
        };
        assert_eq!(err.to_string(), "Malformed frame: expected 44 bytes, got 40");
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_io_error_maps_to_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: DoaError = io.into();
        assert_eq!(err.kind(), "transport");
    }
}
