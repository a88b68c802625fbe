//! A single in-flight synthesis unit.

// -------------------------------------------------------------------------------------------------

/// One grain: a short, envelope-shaped slice of the rolling buffer with its own read
/// position and lifetime. Grains are pooled and re-armed in place; only the scheduler
/// ever touches them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Grain {
    /// Read position in milliseconds. May transiently point outside the buffered
    /// audio; reads clamp to silence there.
    position: f64,
    /// Milliseconds elapsed since spawn.
    age: f64,
    /// Grain duration in milliseconds, fixed at spawn time.
    size: f64,
    // Spawn-time captures: playback advance reads the live engine parameters
    // instead, and randomness has no jitter scheme applied yet.
    #[allow(dead_code)]
    randomness: f32,
    #[allow(dead_code)]
    pitch_factor: f32,
    #[allow(dead_code)]
    time_stretch_factor: f32,
}

impl Default for Grain {
    fn default() -> Self {
        Self::new()
    }
}

impl Grain {
    /// Create a new unarmed grain.
    pub const fn new() -> Self {
        Self {
            position: 0.0,
            age: 0.0,
            size: 0.0,
            randomness: 0.0,
            pitch_factor: 1.0,
            time_stretch_factor: 1.0,
        }
    }

    /// Re-arm a pooled grain with the current engine parameter values.
    pub fn reset(
        &mut self,
        size_ms: f64,
        randomness: f32,
        position_ms: f64,
        time_stretch_factor: f32,
        pitch_factor: f32,
    ) {
        self.position = position_ms;
        self.age = 0.0;
        self.size = size_ms;
        self.randomness = randomness;
        self.pitch_factor = pitch_factor;
        self.time_stretch_factor = time_stretch_factor;
    }

    /// Current read position in milliseconds.
    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Grain duration in milliseconds.
    #[allow(dead_code)]
    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Milliseconds elapsed since spawn.
    #[allow(dead_code)]
    #[inline]
    pub fn age(&self) -> f64 {
        self.age
    }

    /// Override the grain's age. Used by the first-grain bootstrap to start playback
    /// partway into the envelope.
    pub fn set_age(&mut self, age_ms: f64) {
        self.age = age_ms;
    }

    /// Age by one sample period and move the read position. The age advance is
    /// independent of pitch and stretch.
    #[inline]
    pub fn advance(&mut self, ms_per_sample: f64, position_delta_ms: f64) {
        self.age += ms_per_sample;
        self.position += position_delta_ms;
    }

    /// A grain is retired exactly when its age exceeds its duration.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.age > self.size
    }

    /// Position within the grain envelope, `0..=1` over the grain's lifetime.
    #[inline]
    pub fn envelope_fraction(&self) -> f64 {
        self.age / self.size
    }

    #[cfg(test)]
    pub fn randomness(&self) -> f32 {
        self.randomness
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut grain = Grain::new();
        grain.reset(100.0, 0.1, 250.0, 1.0, 2.0);
        assert_eq!(grain.position(), 250.0);
        assert_eq!(grain.age(), 0.0);
        assert_eq!(grain.size(), 100.0);
        assert_eq!(grain.randomness(), 0.1);
        assert!(!grain.is_expired());

        // age by 100 periods of 1 ms: age == size does not expire yet
        for _ in 0..100 {
            grain.advance(1.0, 2.0);
        }
        assert_eq!(grain.age(), 100.0);
        assert_eq!(grain.position(), 250.0 + 100.0 * 2.0);
        assert!(!grain.is_expired());
        assert!((grain.envelope_fraction() - 1.0).abs() < 1e-9);

        // one more period pushes it past its duration
        grain.advance(1.0, 2.0);
        assert!(grain.is_expired());

        // re-arming makes the slot fresh again
        grain.reset(50.0, 0.0, 0.0, -1.0, 1.0);
        assert!(!grain.is_expired());
        assert_eq!(grain.envelope_fraction(), 0.0);
    }

    #[test]
    fn bootstrap_age_override() {
        let mut grain = Grain::new();
        grain.reset(100.0, 0.1, 0.0, 1.0, 1.0);
        grain.set_age(25.0);
        assert_eq!(grain.envelope_fraction(), 0.25);
    }
}
