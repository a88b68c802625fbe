//! Append-only rolling store of all input audio seen so far.

use std::time::Duration;

use assume::assume;

use crate::{utils, Error};

// -------------------------------------------------------------------------------------------------

/// Pitch factor above which grains are read without any interpolation: fast pitched-up
/// playback is cheap to compute and masks the interpolation error.
pub const ADAPTIVE_INTERP_HIGH_THRESH: f32 = 2.5;
/// Pitch factor above which linear interpolation is accurate enough. At or below it,
/// near-unity or slowed playback gets the expensive cubic read.
pub const ADAPTIVE_INTERP_LOW_THRESH: f32 = 0.5;

// -------------------------------------------------------------------------------------------------

/// Read strategy for fractional buffer positions.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display, strum::VariantNames,
)]
#[repr(u8)]
pub enum Interpolation {
    /// Floor of the fractional index, no blending. Cheapest, most aliasing.
    Nearest,
    /// Two-point blend between neighboring samples.
    Linear,
    /// 4-point Hermite interpolation. Most accurate, most expensive.
    Cubic,
}

impl Interpolation {
    /// Pick the read strategy for the given pitch factor by comparing it against
    /// [`ADAPTIVE_INTERP_HIGH_THRESH`] and [`ADAPTIVE_INTERP_LOW_THRESH`].
    #[inline]
    pub fn for_pitch_factor(pitch_factor: f32) -> Self {
        if pitch_factor > ADAPTIVE_INTERP_HIGH_THRESH {
            Self::Nearest
        } else if pitch_factor > ADAPTIVE_INTERP_LOW_THRESH {
            Self::Linear
        } else {
            Self::Cubic
        }
    }
}

// -------------------------------------------------------------------------------------------------

/// A pre-allocated, append-only buffer holding all input samples accumulated so far,
/// up to a fixed maximum duration.
///
/// Reads address the buffer at fractional millisecond offsets and are defensively
/// clamped: positions outside the valid range return silence instead of faulting,
/// which keeps the real-time path crash-free when grains transiently wander past
/// the buffered audio.
#[derive(Debug)]
pub struct RollingBuffer {
    samples: Box<[f32]>,
    /// Count of valid samples written so far - the current "end of known audio".
    watermark: usize,
    /// The length of one sample in milliseconds.
    ms_per_sample: f64,
}

impl RollingBuffer {
    /// Create a store for at most `max_duration` of audio at the given sample rate.
    ///
    /// This is the only allocation the store ever makes.
    pub fn new(sample_rate: u32, max_duration: Duration) -> Result<Self, Error> {
        if sample_rate == 0 {
            return Err(Error::ParameterError(
                "Sample rate must be > 0".to_string(),
            ));
        }
        let capacity = utils::duration_to_sample_count(max_duration, sample_rate);
        if capacity == 0 {
            return Err(Error::ParameterError(
                "Rolling buffer capacity must hold at least one sample".to_string(),
            ));
        }
        log::debug!(
            "Allocating rolling buffer for {:?} of audio at {} Hz ({} samples)",
            max_duration,
            sample_rate,
            capacity
        );
        Ok(Self {
            samples: vec![0.0; capacity].into_boxed_slice(),
            watermark: 0,
            ms_per_sample: utils::ms_per_sample(sample_rate),
        })
    }

    /// Count of valid samples written so far.
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Total sample capacity, fixed at construction.
    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    /// The length of one sample in milliseconds.
    pub fn ms_per_sample(&self) -> f64 {
        self.ms_per_sample
    }

    /// Append a block of new samples at the watermark.
    ///
    /// There is no backpressure and no compaction: appending past the pre-allocated
    /// capacity fails with [`Error::CapacityExceeded`], which is fatal for the stream.
    pub fn append(&mut self, block: &[f32]) -> Result<(), Error> {
        let end = self.watermark + block.len();
        if end > self.samples.len() {
            return Err(Error::CapacityExceeded {
                watermark: self.watermark,
                capacity: self.samples.len(),
            });
        }
        self.samples[self.watermark..end].copy_from_slice(block);
        self.watermark = end;
        Ok(())
    }

    /// Read an interpolated sample at a fractional millisecond position with the
    /// given read strategy.
    #[inline]
    pub fn read(&self, position_ms: f64, interpolation: Interpolation) -> f32 {
        match interpolation {
            Interpolation::Nearest => self.read_nearest(position_ms),
            Interpolation::Linear => self.read_linear(position_ms),
            Interpolation::Cubic => self.read_cubic(position_ms),
        }
    }

    /// Read the sample at the floor of the fractional index. Returns silence when the
    /// floored index falls outside the valid range.
    pub fn read_nearest(&self, position_ms: f64) -> f32 {
        let index = self.ms_to_samples(position_ms).floor();
        if index >= 0.0 && (index as usize) < self.watermark {
            let index = index as usize;
            assume!(unsafe: index < self.samples.len());
            self.samples[index]
        } else {
            0.0
        }
    }

    /// Read with linear interpolation between the two neighboring samples. The last
    /// valid sample is returned unblended; everything outside the valid range is silence.
    pub fn read_linear(&self, position_ms: f64) -> f32 {
        let sample_number = self.ms_to_samples(position_ms);
        let sample_number_floor = sample_number.floor();
        if sample_number_floor < 0.0 || sample_number_floor as usize >= self.watermark {
            return 0.0;
        }
        let index = sample_number_floor as usize;
        assume!(unsafe: index < self.samples.len());
        if index == self.watermark - 1 {
            // no upper neighbor to blend with
            self.samples[index]
        } else {
            let fraction = (sample_number - sample_number_floor) as f32;
            assume!(unsafe: index + 1 < self.samples.len());
            let current = self.samples[index];
            let next = self.samples[index + 1];
            (1.0 - fraction) * current + fraction * next
        }
    }

    /// Read with 4-point Hermite interpolation using one sample before and two after
    /// the floored index. Neighbors falling outside the valid range are clamped to the
    /// first/last valid sample; a floored index outside `[0, watermark - 1)` is silence.
    pub fn read_cubic(&self, position_ms: f64) -> f32 {
        let frame = self.ms_to_samples(position_ms);
        let frame_floor = frame.floor();
        if frame_floor < 0.0 || self.watermark < 2 {
            return 0.0;
        }
        let current = frame_floor as usize;
        let last = self.watermark - 1;
        if current >= last {
            return 0.0;
        }
        let fraction = (frame - frame_floor) as f32;

        assume!(unsafe: current < self.samples.len());
        assume!(unsafe: current + 1 < self.samples.len());
        let ym1 = self.samples[current.saturating_sub(1)];
        let y0 = self.samples[current];
        let y1 = self.samples[current + 1];
        let y2 = self.samples[(current + 2).min(last)];

        let mu2 = fraction * fraction;
        let a0 = y2 - y1 - ym1 + y0;
        let a1 = ym1 - y0 - a0;
        let a2 = y1 - ym1;
        let a3 = y0;
        a0 * fraction * mu2 + a1 * mu2 + a2 * fraction + a3
    }

    /// Convert a millisecond position into a fractional sample index.
    #[inline]
    fn ms_to_samples(&self, position_ms: f64) -> f64 {
        position_ms / self.ms_per_sample
    }
}

// -------------------------------------------------------------------------------------------------
