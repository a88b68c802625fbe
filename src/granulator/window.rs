//! Grain amplitude envelopes.

use std::f32::consts::PI;

// -------------------------------------------------------------------------------------------------

/// Envelope curve applied across a grain's lifetime to avoid audible clicks at grain
/// boundaries. Selected once when constructing the engine.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::EnumString, strum::Display,
    strum::VariantNames,
)]
#[repr(u8)]
pub enum GrainWindowMode {
    /// Raised-cosine bump, the classic grain envelope.
    #[default]
    Cosine,
    /// Cosine-squared window with perfect overlap-add behavior.
    Hann,
    /// Linear rise to the midpoint, linear fall.
    Triangle,
}

// -------------------------------------------------------------------------------------------------

/// A fixed-length, precomputed envelope curve with fractional-position lookup.
#[derive(Debug, Clone)]
pub struct GrainWindow {
    curve: Box<[f32]>,
}

impl GrainWindow {
    /// Precompute the curve for the given mode with `length` samples.
    pub fn new(mode: GrainWindowMode, length: usize) -> Self {
        debug_assert!(length > 0, "Need a non-empty window curve");
        let mut curve = vec![0.0; length].into_boxed_slice();
        for (index, value) in curve.iter_mut().enumerate() {
            let phase = index as f32 / length as f32;
            *value = match mode {
                GrainWindowMode::Cosine => (PI * phase).sin(),
                GrainWindowMode::Hann => 0.5 * (1.0 - (2.0 * PI * phase).cos()),
                GrainWindowMode::Triangle => {
                    if phase < 0.5 {
                        2.0 * phase
                    } else {
                        2.0 * (1.0 - phase)
                    }
                }
            };
        }
        Self { curve }
    }

    /// Number of samples in the precomputed curve.
    pub fn len(&self) -> usize {
        self.curve.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curve.is_empty()
    }

    /// The curve's value at the given fraction along its length (0 = start, 1 = end),
    /// linearly interpolating between adjacent curve samples.
    ///
    /// Lookups wrap at the curve's end, so the curve is treated as periodic:
    /// `value_at(1.0) == value_at(0.0)`.
    #[inline]
    pub fn value_at(&self, fraction: f64) -> f32 {
        let length = self.curve.len();
        let position = fraction * length as f64;
        let offset = (position - position.floor()) as f32;
        let lower_index = (position.floor() as usize) % length;
        let upper_index = (lower_index + 1) % length;
        (1.0 - offset) * self.curve[lower_index] + offset * self.curve[upper_index]
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::assert_eq_with_epsilon;

    #[test]
    fn periodic_wraparound() {
        for mode in [
            GrainWindowMode::Cosine,
            GrainWindowMode::Hann,
            GrainWindowMode::Triangle,
        ] {
            let window = GrainWindow::new(mode, 512);
            assert_eq!(window.value_at(0.0), window.value_at(1.0));
        }
    }

    #[test]
    fn peaks_at_center() {
        let window = GrainWindow::new(GrainWindowMode::Cosine, 512);
        assert_eq_with_epsilon!(window.value_at(0.5), 1.0, 1e-6);
        // edges of the raised cosine are (near) silent
        assert_eq_with_epsilon!(window.value_at(0.0), 0.0, 1e-6);

        let window = GrainWindow::new(GrainWindowMode::Triangle, 512);
        assert_eq_with_epsilon!(window.value_at(0.5), 1.0, 1e-6);
    }

    #[test]
    fn interpolates_between_curve_samples() {
        let window = GrainWindow::new(GrainWindowMode::Triangle, 4);
        // curve is [0.0, 0.5, 1.0, 0.5]; a lookup halfway between the first two
        // curve samples must blend them
        assert_eq_with_epsilon!(window.value_at(0.125), 0.25, 1e-6);
    }

    #[test]
    fn mode_names_parse() {
        use std::str::FromStr;
        assert_eq!(
            GrainWindowMode::from_str("Hann").unwrap(),
            GrainWindowMode::Hann
        );
        assert_eq!(GrainWindowMode::Cosine.to_string(), "Cosine");
    }
}
