//! Far-field plane wave on a uniform linear array
//!
//! With half-wavelength spacing the differential delay between neighbouring
//! antennas is `π·sin(θ)` radians of carrier phase, so antenna `n` sees
//!
//! ```text
//! x[m, n, s] = g_m · exp(i·φ·s) · exp(−iπ·sin(θ)·n)  +  w[m, n, s]
//! ```
//!
//! where `g_m` is a random unit-magnitude gain per measurement, `φ` the
//! per-subcarrier phase slope (a fixed timing offset) and `w` circular complex
//! Gaussian noise at the configured SNR. The array phase convention matches
//! [`doa_core::steering_vector`].

use doa_core::{CsiFrame, CsiSample, DoaResult, HeaderLayout};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Plane-wave scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneWaveConfig {
    pub antennas: usize,
    pub subcarriers: usize,
    /// Measurements per generated frame
    pub measurements: usize,
    /// Arrival angle from broadside in degrees
    pub angle_deg: f64,
    /// Per-sample SNR; `None` disables noise
    pub snr_db: Option<f64>,
    pub seed: u64,
    /// Phase advance between adjacent subcarriers in radians
    pub subcarrier_phase_step: f64,
}

impl Default for PlaneWaveConfig {
    fn default() -> Self {
        Self {
            antennas: 4,
            subcarriers: 64,
            measurements: 1,
            angle_deg: 0.0,
            snr_db: Some(40.0),
            seed: 0,
            subcarrier_phase_step: 0.1,
        }
    }
}

impl PlaneWaveConfig {
    /// Noise-free variant of `self`.
    pub fn noiseless(mut self) -> Self {
        self.snr_db = None;
        self
    }
}

/// Deterministic plane-wave CSI generator.
#[derive(Debug)]
pub struct PlaneWave {
    config: PlaneWaveConfig,
    rng: StdRng,
    noise: Option<Normal<f64>>,
}

impl PlaneWave {
    pub fn new(config: PlaneWaveConfig) -> Self {
        let noise = config.snr_db.and_then(|snr_db| {
            // Unit signal power; split noise power evenly over I and Q.
            let snr_linear = 10.0_f64.powf(snr_db / 10.0);
            let std = (1.0 / snr_linear / 2.0).sqrt();
            match Normal::new(0.0, std) {
                Ok(dist) => Some(dist),
                Err(e) => {
                    tracing::warn!(snr_db, error = %e, "invalid SNR, generating without noise");
                    None
                }
            }
        });

        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            noise,
        }
    }

    pub fn config(&self) -> &PlaneWaveConfig {
        &self.config
    }

    /// Change the arrival angle, keeping the random stream.
    pub fn set_angle(&mut self, angle_deg: f64) {
        self.config.angle_deg = angle_deg;
    }

    /// Generate one frame of `measurements × antennas × subcarriers` samples.
    pub fn generate(&mut self) -> DoaResult<CsiFrame> {
        let PlaneWaveConfig {
            antennas,
            subcarriers,
            measurements,
            angle_deg,
            subcarrier_phase_step,
            ..
        } = self.config;

        let array_step = -PI * angle_deg.to_radians().sin();
        let mut samples = Vec::with_capacity(measurements * antennas * subcarriers);

        for _ in 0..measurements {
            let gain = Complex64::from_polar(1.0, self.rng.gen_range(-PI..PI));
            for n in 0..antennas {
                for s in 0..subcarriers {
                    let phase = array_step * n as f64 + subcarrier_phase_step * s as f64;
                    let mut x = gain * Complex64::from_polar(1.0, phase);
                    if let Some(dist) = &self.noise {
                        x += Complex64::new(dist.sample(&mut self.rng), dist.sample(&mut self.rng));
                    }
                    samples.push(CsiSample::new(x.re as f32, x.im as f32));
                }
            }
        }

        CsiFrame::new(measurements, antennas, subcarriers, samples)
    }

    /// `count` consecutive frames.
    pub fn frames(&mut self, count: usize) -> DoaResult<Vec<CsiFrame>> {
        (0..count).map(|_| self.generate()).collect()
    }

    /// One encoded wire message.
    pub fn encode(&mut self, layout: HeaderLayout) -> DoaResult<Vec<u8>> {
        self.generate()?.encode(layout)
    }

    /// `count` encoded wire messages, ready for an ingest batch.
    pub fn messages(&mut self, count: usize, layout: HeaderLayout) -> DoaResult<Vec<Vec<u8>>> {
        (0..count).map(|_| self.encode(layout)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doa_core::{steering_vector, FrameDecoder};

    #[test]
    fn test_frame_shape() {
        let mut wave = PlaneWave::new(PlaneWaveConfig {
            antennas: 3,
            subcarriers: 8,
            measurements: 2,
            ..Default::default()
        });
        let frame = wave.generate().unwrap();
        assert_eq!(frame.measurements(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.samples_per_channel(), 8);
        assert_eq!(frame.samples().len(), 48);
    }

    #[test]
    fn test_noiseless_phase_progression() {
        let angle = 37.0_f64;
        let mut wave = PlaneWave::new(
            PlaneWaveConfig {
                antennas: 5,
                subcarriers: 4,
                angle_deg: angle,
                ..Default::default()
            }
            .noiseless(),
        );
        let frame = wave.generate().unwrap();
        let a = steering_vector(angle.to_radians(), 5);

        for s in 0..4 {
            let x0 = frame.get(0, 0, s);
            let x0 = Complex64::new(x0.re as f64, x0.im as f64);
            assert!((x0.norm() - 1.0).abs() < 1e-6);
            for n in 1..5 {
                let xn = frame.get(0, n, s);
                let xn = Complex64::new(xn.re as f64, xn.im as f64);
                // Ratio to antenna 0 is the steering vector entry.
                assert!((xn / x0 - a[n]).norm() < 1e-5, "n={n} s={s}");
            }
        }
    }

    #[test]
    fn test_seed_is_deterministic() {
        let cfg = PlaneWaveConfig {
            seed: 7,
            ..Default::default()
        };
        let a = PlaneWave::new(cfg.clone()).frames(3).unwrap();
        let b = PlaneWave::new(cfg).frames(3).unwrap();
        assert_eq!(a, b);

        let c = PlaneWave::new(PlaneWaveConfig {
            seed: 8,
            ..Default::default()
        })
        .generate()
        .unwrap();
        assert_ne!(a[0], c);
    }

    #[test]
    fn test_noise_power_matches_snr() {
        let snr_db = 10.0;
        let cfg = PlaneWaveConfig {
            antennas: 2,
            subcarriers: 256,
            measurements: 20,
            snr_db: Some(snr_db),
            seed: 42,
            ..Default::default()
        };
        let noisy = PlaneWave::new(cfg.clone()).generate().unwrap();
        let clean = PlaneWave::new(cfg.noiseless()).generate().unwrap();

        // Same seed: noiseless stream draws the same gains only for the first
        // measurement, so compare the first one.
        let mut noise_power = 0.0;
        let mut count = 0;
        for n in 0..2 {
            for s in 0..256 {
                let d = noisy.get(0, n, s) - clean.get(0, n, s);
                noise_power += d.norm_sqr() as f64;
                count += 1;
            }
        }
        noise_power /= count as f64;
        let expected = 10.0_f64.powf(-snr_db / 10.0);
        assert!(
            (noise_power / expected - 1.0).abs() < 0.25,
            "noise power {noise_power}, expected {expected}"
        );
    }

    #[test]
    fn test_messages_decode() {
        let mut wave = PlaneWave::new(PlaneWaveConfig::default());
        let msgs = wave.messages(2, HeaderLayout::Compact).unwrap();
        assert_eq!(msgs.len(), 2);
        let frame = FrameDecoder::new(HeaderLayout::Compact).decode(&msgs[0]).unwrap();
        assert_eq!(frame.channels(), 4);
        assert_eq!(frame.samples_per_channel(), 64);
    }
}
