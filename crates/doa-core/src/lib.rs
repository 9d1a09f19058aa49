//! # CSI Direction-of-Arrival Library
//!
//! MUSIC (MUltiple SIgnal Classification) direction-of-arrival estimation on
//! a uniform linear array, fed by a stream of Channel State Information
//! frames.
//!
//! ## Overview
//!
//! - **Frames**: little-endian wire format, batched or compact header
//! - **Accumulation**: replace-not-append CSI buffer with per-frame error isolation
//! - **Covariance**: sum of outer products over measurements and subcarriers
//! - **Subspaces**: general complex eigensolver, rank-1 signal subspace
//! - **Spectrum**: steering-vector projection onto the noise subspace, in dB
//!
//! ## Signal Flow
//!
//! ```text
//! bytes → FrameDecoder → FrameAccumulator → CovarianceEstimator
//!       → SubspaceSeparator → SpectrumSynthesizer (SteeringVectorBank) → SpatialSpectrum
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use doa_core::{DoaConfig, MusicEstimator, UdpFrameSource};
//! use std::time::Duration;
//!
//! let config = DoaConfig::load()?;
//! doa_core::observe::init_logging(&config.logging);
//!
//! let mut source = UdpFrameSource::bind(&config.transport.udp)?;
//! let mut estimator = MusicEstimator::new(&config);
//!
//! loop {
//!     estimator.ingest(&mut source);
//!     if let Some(spectrum) = estimator.refresh() {
//!         if let Some((angle, power)) = spectrum.peak() {
//!             println!("{angle:+6.1}°  {power:6.1} dB");
//!         }
//!     }
//!     std::thread::sleep(Duration::from_millis(config.refresh.interval_ms));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod accumulator;
pub mod config;
pub mod covariance;
pub mod estimator;
pub mod frame;
pub mod observe;
pub mod spectrum;
pub mod steering;
pub mod subspace;
pub mod transport;
pub mod types;

pub use accumulator::{AntennaChange, CsiBuffer, FrameAccumulator, IngestReport, MIN_ANTENNAS};
pub use config::{ConfigError, DoaConfig};
pub use covariance::{CovarianceEstimator, CovarianceMatrix};
pub use estimator::{MusicEstimator, SharedEstimator};
pub use frame::{CsiFrame, FrameDecoder, FrameHeader, HeaderLayout};
pub use spectrum::{DisplayBounds, SpatialSpectrum, SpectrumSynthesizer};
pub use steering::{steering_vector, AngleGrid, SteeringVectorBank, ANGLES_COARSE, ANGLES_FINE};
pub use subspace::{EigenDecomposition, SubspaceSeparator, Subspaces};
pub use transport::{ChannelSource, FrameSource, UdpFrameSource, UdpSourceConfig};
pub use types::{Complex, CsiSample, DoaError, DoaResult};
