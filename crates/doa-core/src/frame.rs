//! CSI frame wire format
//!
//! Each transport message carries one batch of CSI snapshots:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬─────────────────────────────┐
//! │ measurements │   channels   │   samples    │ payload: cf32 × m·c·s       │
//! │   u32 LE     │   u32 LE     │   u32 LE     │ (re f32 LE, im f32 LE) ...  │
//! └──────────────┴──────────────┴──────────────┴─────────────────────────────┘
//! ```
//!
//! The payload is row-major over `(measurement, channel, sample)`. One channel
//! is one antenna, one sample is one subcarrier.
//!
//! The [`HeaderLayout::Compact`] layout omits the measurement word; it is the
//! format produced by older sender tooling that always shipped a single
//! measurement per message.
//!
//! ## Example
//!
//! ```rust
//! use doa_core::frame::{CsiFrame, FrameDecoder, HeaderLayout};
//! use doa_core::types::CsiSample;
//!
//! let frame = CsiFrame::new(1, 2, 2, vec![CsiSample::new(1.0, 0.0); 4]).unwrap();
//! let bytes = frame.encode(HeaderLayout::Batched).unwrap();
//! assert_eq!(bytes.len(), 12 + 4 * 8);
//!
//! let decoded = FrameDecoder::default().decode(&bytes).unwrap();
//! assert_eq!(decoded, frame);
//! ```

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::types::{CsiSample, DoaError, DoaResult};

/// Bytes per complex sample on the wire (two `f32`)
pub const BYTES_PER_SAMPLE: usize = 8;

/// Header word layout of a transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderLayout {
    /// `(measurement_count, channel_count, samples_per_channel)`, 12 bytes
    #[default]
    Batched,
    /// `(channel_count, samples_per_channel)`, 8 bytes, one measurement implied
    Compact,
}

impl HeaderLayout {
    /// Size of the header in bytes.
    #[inline]
    pub const fn header_len(&self) -> usize {
        match self {
            HeaderLayout::Batched => 12,
            HeaderLayout::Compact => 8,
        }
    }
}

/// Decoded header dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHeader {
    pub measurements: u32,
    pub channels: u32,
    pub samples_per_channel: u32,
}

impl FrameHeader {
    /// Parse the header words. `data` must hold at least `layout.header_len()` bytes.
    fn read(layout: HeaderLayout, data: &[u8]) -> Self {
        match layout {
            HeaderLayout::Batched => Self {
                measurements: LittleEndian::read_u32(&data[0..4]),
                channels: LittleEndian::read_u32(&data[4..8]),
                samples_per_channel: LittleEndian::read_u32(&data[8..12]),
            },
            HeaderLayout::Compact => Self {
                measurements: 1,
                channels: LittleEndian::read_u32(&data[0..4]),
                samples_per_channel: LittleEndian::read_u32(&data[4..8]),
            },
        }
    }

    /// Number of complex elements declared by the header.
    ///
    /// `None` when the product does not fit in `usize`.
    pub fn element_count(&self) -> Option<usize> {
        (self.measurements as usize)
            .checked_mul(self.channels as usize)?
            .checked_mul(self.samples_per_channel as usize)
    }

    /// Exact message length this header requires, header included.
    pub fn message_len(&self, layout: HeaderLayout) -> Option<usize> {
        self.element_count()?
            .checked_mul(BYTES_PER_SAMPLE)?
            .checked_add(layout.header_len())
    }
}

/// One decoded transport message: CSI samples indexed by
/// `(measurement, channel, sample)`.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct CsiFrame {
    measurements: usize,
    channels: usize,
    samples_per_channel: usize,
    samples: Vec<CsiSample>,
}

impl CsiFrame {
    /// Build a frame from row-major samples.
    ///
    /// Fails with [`DoaError::ReshapeMismatch`] if the sample count does not
    /// equal `measurements × channels × samples_per_channel`.
    pub fn new(
        measurements: usize,
        channels: usize,
        samples_per_channel: usize,
        samples: Vec<CsiSample>,
    ) -> DoaResult<Self> {
        let expected = measurements
            .checked_mul(channels)
            .and_then(|n| n.checked_mul(samples_per_channel))
            .ok_or(DoaError::ReshapeMismatch {
                expected: usize::MAX,
                actual: samples.len(),
            })?;
        if samples.len() != expected {
            return Err(DoaError::ReshapeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            measurements,
            channels,
            samples_per_channel,
            samples,
        })
    }

    pub fn measurements(&self) -> usize {
        self.measurements
    }

    /// Number of channels, i.e. antennas.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of samples per channel, i.e. subcarriers.
    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    /// Raw row-major samples.
    pub fn samples(&self) -> &[CsiSample] {
        &self.samples
    }

    /// True when the frame carries no observations.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample at `(measurement, channel, sample)`.
    #[inline]
    pub fn get(&self, measurement: usize, channel: usize, sample: usize) -> CsiSample {
        let idx = (measurement * self.channels + channel) * self.samples_per_channel + sample;
        self.samples[idx]
    }

    /// Consume the frame, returning its row-major samples.
    pub fn into_samples(self) -> Vec<CsiSample> {
        self.samples
    }

    /// Serialize the frame in the given header layout.
    ///
    /// The compact layout cannot express more than one measurement; such
    /// frames are rejected with [`DoaError::MalformedFrame`].
    pub fn encode(&self, layout: HeaderLayout) -> DoaResult<Vec<u8>> {
        if layout == HeaderLayout::Compact && self.measurements != 1 {
            return Err(DoaError::MalformedFrame {
                expected: 1,
                actual: self.measurements,
            });
        }

        let mut buf =
            Vec::with_capacity(layout.header_len() + self.samples.len() * BYTES_PER_SAMPLE);
        if layout == HeaderLayout::Batched {
            buf.write_u32::<LittleEndian>(header_field(self.measurements)?)?;
        }
        buf.write_u32::<LittleEndian>(header_field(self.channels)?)?;
        buf.write_u32::<LittleEndian>(header_field(self.samples_per_channel)?)?;
        for s in &self.samples {
            buf.write_f32::<LittleEndian>(s.re)?;
            buf.write_f32::<LittleEndian>(s.im)?;
        }
        Ok(buf)
    }
}

/// Header dimensions are `u32` on the wire.
fn header_field(value: usize) -> DoaResult<u32> {
    u32::try_from(value).map_err(|_| DoaError::MalformedFrame {
        expected: u32::MAX as usize,
        actual: value,
    })
}

/// Stateless decoder for transport messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    layout: HeaderLayout,
}

impl FrameDecoder {
    pub fn new(layout: HeaderLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    /// Decode one message.
    ///
    /// The message length must equal `header_len + 8 × m·c·s` exactly; any
    /// other length (including a buffer too short to hold the header) is
    /// [`DoaError::MalformedFrame`].
    pub fn decode(&self, data: &[u8]) -> DoaResult<CsiFrame> {
        let header_len = self.layout.header_len();
        if data.len() < header_len {
            return Err(DoaError::MalformedFrame {
                expected: header_len,
                actual: data.len(),
            });
        }

        let header = FrameHeader::read(self.layout, data);
        let expected = header
            .message_len(self.layout)
            .ok_or(DoaError::MalformedFrame {
                expected: usize::MAX,
                actual: data.len(),
            })?;
        if data.len() != expected {
            return Err(DoaError::MalformedFrame {
                expected,
                actual: data.len(),
            });
        }

        let samples: Vec<CsiSample> = data[header_len..]
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|chunk| {
                CsiSample::new(
                    LittleEndian::read_f32(&chunk[0..4]),
                    LittleEndian::read_f32(&chunk[4..8]),
                )
            })
            .collect();

        CsiFrame::new(
            header.measurements as usize,
            header.channels as usize,
            header.samples_per_channel as usize,
            samples,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_message(m: u32, c: u32, s: u32, payload_samples: usize) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&m.to_le_bytes());
        buf.extend_from_slice(&c.to_le_bytes());
        buf.extend_from_slice(&s.to_le_bytes());
        for i in 0..payload_samples {
            buf.extend_from_slice(&(i as f32).to_le_bytes());
            buf.extend_from_slice(&(-(i as f32)).to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_decode_row_major() {
        let bytes = raw_message(2, 3, 4, 24);
        let frame = FrameDecoder::default().decode(&bytes).unwrap();
        assert_eq!(frame.measurements(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.samples_per_channel(), 4);
        // (1, 2, 3) -> 1*12 + 2*4 + 3 = 23
        assert_eq!(frame.get(1, 2, 3), CsiSample::new(23.0, -23.0));
        assert_eq!(frame.get(0, 1, 0), CsiSample::new(4.0, -4.0));
    }

    #[test]
    fn test_encode_decode_bit_exact() {
        let samples = vec![
            CsiSample::new(f32::MIN_POSITIVE, -0.0),
            CsiSample::new(1.0e-38, 3.402_823e38),
            CsiSample::new(-1.5, 0.1),
            CsiSample::new(f32::EPSILON, -f32::EPSILON),
        ];
        let frame = CsiFrame::new(1, 2, 2, samples.clone()).unwrap();
        let bytes = frame.encode(HeaderLayout::Batched).unwrap();
        let decoded = FrameDecoder::default().decode(&bytes).unwrap();
        for (a, b) in decoded.samples().iter().zip(samples.iter()) {
            assert_eq!(a.re.to_bits(), b.re.to_bits());
            assert_eq!(a.im.to_bits(), b.im.to_bits());
        }
    }

    #[test]
    fn test_rejects_short_payload() {
        let bytes = raw_message(1, 2, 4, 7);
        let err = FrameDecoder::default().decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            DoaError::MalformedFrame {
                expected: 12 + 64,
                actual: 12 + 56
            }
        );
    }

    #[test]
    fn test_rejects_long_payload() {
        let mut bytes = raw_message(1, 2, 4, 8);
        bytes.push(0);
        assert!(matches!(
            FrameDecoder::default().decode(&bytes),
            Err(DoaError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_zero_dimensions() {
        let decoder = FrameDecoder::default();
        for (m, c, s) in [(0, 4, 4), (4, 0, 4), (4, 4, 0), (0, 0, 0)] {
            // Header only is exactly right for an empty product.
            let frame = decoder.decode(&raw_message(m, c, s, 0)).unwrap();
            assert!(frame.is_empty());
            // Any trailing payload is not.
            assert!(decoder.decode(&raw_message(m, c, s, 1)).is_err());
        }
    }

    #[test]
    fn test_truncated_header() {
        let err = FrameDecoder::default().decode(&[1, 0, 0, 0, 2]).unwrap_err();
        assert_eq!(
            err,
            DoaError::MalformedFrame {
                expected: 12,
                actual: 5
            }
        );
    }

    #[test]
    fn test_overflowing_header() {
        let bytes = raw_message(u32::MAX, u32::MAX, u32::MAX, 0);
        assert!(matches!(
            FrameDecoder::default().decode(&bytes),
            Err(DoaError::MalformedFrame { .. })
        ));
    }

    #[test]
    fn test_compact_layout() {
        let frame = CsiFrame::new(1, 2, 3, vec![CsiSample::new(0.5, 0.25); 6]).unwrap();
        let bytes = frame.encode(HeaderLayout::Compact).unwrap();
        assert_eq!(bytes.len(), 8 + 6 * 8);

        let decoded = FrameDecoder::new(HeaderLayout::Compact).decode(&bytes).unwrap();
        assert_eq!(decoded, frame);

        let multi = CsiFrame::new(2, 1, 1, vec![CsiSample::new(0.0, 0.0); 2]).unwrap();
        assert!(multi.encode(HeaderLayout::Compact).is_err());
    }

    #[test]
    fn test_frame_new_reshape_mismatch() {
        let err = CsiFrame::new(2, 2, 2, vec![CsiSample::new(0.0, 0.0); 7]).unwrap_err();
        assert_eq!(
            err,
            DoaError::ReshapeMismatch {
                expected: 8,
                actual: 7
            }
        );
    }

    #[test]
    fn test_frame_new_dimension_overflow() {
        let err = CsiFrame::new(usize::MAX, 2, 1, Vec::new()).unwrap_err();
        assert_eq!(
            err,
            DoaError::ReshapeMismatch {
                expected: usize::MAX,
                actual: 0
            }
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_encode_rejects_dimension_beyond_u32() {
        let too_many = u32::MAX as usize + 1;
        let frame = CsiFrame::new(too_many, 0, 4, Vec::new()).unwrap();
        assert_eq!(
            frame.encode(HeaderLayout::Batched).unwrap_err(),
            DoaError::MalformedFrame {
                expected: u32::MAX as usize,
                actual: too_many
            }
        );
    }
}
