//! Lock-free engine parameters, shared between control and audio contexts.

use std::sync::atomic::Ordering;

use atomic_float::{AtomicF32, AtomicF64};

use crate::Error;

// -------------------------------------------------------------------------------------------------

/// The granulator's mutable control parameters as a block of lock-free atomic fields.
///
/// Setters may be called from any thread through a cloned [`Arc`](std::sync::Arc) while the
/// audio thread keeps processing: each field is an independent atomic, so a value written here
/// is picked up on the engine's next sample tick. There is *no* atomicity across multiple
/// fields - when several parameters must change together, a tick in between may observe a
/// mix of old and new values for its duration of one sample.
#[derive(Debug)]
pub struct GranulatorParameters {
    /// Nominal playback position in milliseconds. Also advanced by the scheduler on
    /// every tick, so an externally written value may be off by one tick's increment.
    position: AtomicF64,
    /// Time in milliseconds between grain spawns.
    grain_interval: AtomicF32,
    /// Duration in milliseconds of newly spawned grains.
    grain_size: AtomicF32,
    /// Spawn jitter fraction, recorded per grain. No jitter is currently applied.
    grain_randomness: AtomicF32,
    /// Multiplier on how fast a grain's own read position advances in the buffer.
    pitch_factor: AtomicF32,
    /// Multiplier on how fast the nominal position advances. The sign selects the
    /// playback direction.
    time_stretch_factor: AtomicF32,
}

/// Plain-value copy of all [`GranulatorParameters`], read once per sample tick.
#[derive(Debug, Clone, Copy)]
pub struct ParameterSnapshot {
    pub position: f64,
    pub grain_interval: f32,
    pub grain_size: f32,
    pub grain_randomness: f32,
    pub pitch_factor: f32,
    pub time_stretch_factor: f32,
}

// -------------------------------------------------------------------------------------------------

impl GranulatorParameters {
    pub(crate) fn new(grain_interval: f32, grain_size: f32, grain_randomness: f32) -> Self {
        debug_assert!(grain_interval > 0.0 && grain_size > 0.0, "Invalid grain times");
        Self {
            position: AtomicF64::new(0.0),
            grain_interval: AtomicF32::new(grain_interval),
            grain_size: AtomicF32::new(grain_size),
            grain_randomness: AtomicF32::new(grain_randomness),
            pitch_factor: AtomicF32::new(1.0),
            time_stretch_factor: AtomicF32::new(1.0),
        }
    }

    /// Set the nominal playback position in seconds.
    pub fn set_position(&self, seconds: f32) {
        self.position.store(seconds as f64 * 1000.0, Ordering::Release);
    }

    /// The current nominal playback position in milliseconds.
    pub fn position_ms(&self) -> f64 {
        self.position.load(Ordering::Acquire)
    }

    /// Advance the nominal playback position. Called by the scheduler on every tick.
    pub(crate) fn advance_position(&self, delta_ms: f64) {
        self.position.fetch_add(delta_ms, Ordering::AcqRel);
    }

    /// Set the interpolation-rate multiplier for grain playback.
    pub fn set_pitch_shift_factor(&self, factor: f32) {
        self.pitch_factor.store(factor, Ordering::Release);
    }

    /// Set the position-advance multiplier. Negative factors play backwards.
    pub fn set_timestretch_factor(&self, factor: f32) {
        self.time_stretch_factor.store(factor, Ordering::Release);
    }

    /// Set the time between grain spawns in milliseconds.
    pub fn set_grain_interval(&self, milliseconds: u32) -> Result<(), Error> {
        if milliseconds == 0 {
            return Err(Error::ParameterError(
                "Grain interval must be > 0 ms".to_string(),
            ));
        }
        self.grain_interval.store(milliseconds as f32, Ordering::Release);
        Ok(())
    }

    /// Set the duration of newly spawned grains in milliseconds.
    ///
    /// A zero size is rejected: it would blow up the grain envelope fraction.
    pub fn set_grain_size(&self, milliseconds: u32) -> Result<(), Error> {
        if milliseconds == 0 {
            return Err(Error::ParameterError(
                "Grain size must be > 0 ms".to_string(),
            ));
        }
        self.grain_size.store(milliseconds as f32, Ordering::Release);
        Ok(())
    }

    /// Set the spawn jitter fraction in range `0..=1`.
    pub fn set_grain_randomness(&self, fraction: f32) {
        self.grain_randomness.store(fraction, Ordering::Release);
    }

    /// Grab a plain-value copy of all parameters for one sample tick.
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            position: self.position.load(Ordering::Acquire),
            grain_interval: self.grain_interval.load(Ordering::Acquire),
            grain_size: self.grain_size.load(Ordering::Acquire),
            grain_randomness: self.grain_randomness.load(Ordering::Acquire),
            pitch_factor: self.pitch_factor.load(Ordering::Acquire),
            time_stretch_factor: self.time_stretch_factor.load(Ordering::Acquire),
        }
    }
}

// -------------------------------------------------------------------------------------------------
