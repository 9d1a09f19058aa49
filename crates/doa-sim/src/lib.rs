//! # CSI Simulation
//!
//! Synthetic channel state information for exercising the DoA pipeline
//! without radio hardware:
//!
//! - **Plane waves**: a single far-field source over a uniform linear array,
//!   with optional complex AWGN
//! - **Transport**: a UDP sink that ships encoded frames to a
//!   [`doa_core::UdpFrameSource`]
//!
//! ## Example
//!
//! ```rust
//! use doa_sim::{PlaneWave, PlaneWaveConfig};
//! use doa_core::{HeaderLayout, MusicEstimator};
//!
//! let mut wave = PlaneWave::new(PlaneWaveConfig {
//!     antennas: 4,
//!     angle_deg: 25.0,
//!     ..Default::default()
//! });
//!
//! let mut estimator = MusicEstimator::default();
//! estimator.ingest_batch(wave.messages(4, HeaderLayout::Batched).unwrap());
//! let (angle, _) = estimator.refresh().unwrap().peak().unwrap();
//! assert!((angle - 25.0).abs() < 2.0);
//! ```

pub mod plane_wave;
pub mod sink;

pub use plane_wave::{PlaneWave, PlaneWaveConfig};
pub use sink::UdpFrameSink;
