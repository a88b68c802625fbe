#![allow(unused_macros)]

//! Small shared sample-time helpers.

use std::time::Duration;

// -------------------------------------------------------------------------------------------------

macro_rules! assert_eq_with_epsilon {
    ($x:expr, $y:expr, $d:expr) => {
        if ($x - $y).abs() > $d {
            panic!(
                "assertion failed: `{}` differs from `{}` by more than `{}`",
                $x, $y, $d
            );
        }
    };
}
pub(crate) use assert_eq_with_epsilon;

// -------------------------------------------------------------------------------------------------

/// The length of one sample in milliseconds at the given sample rate.
pub fn ms_per_sample(sample_rate: u32) -> f64 {
    debug_assert!(sample_rate > 0, "Invalid sample rate");
    1000.0 / sample_rate as f64
}

// -------------------------------------------------------------------------------------------------

/// Number of whole samples needed to hold `duration` of mono audio at the given sample rate.
pub fn duration_to_sample_count(duration: Duration, sample_rate: u32) -> usize {
    debug_assert!(sample_rate > 0, "Invalid sample rate");
    (duration.as_secs_f64() * sample_rate as f64) as usize
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_time_conversions() {
        assert_eq!(ms_per_sample(1000), 1.0);
        assert_eq_with_epsilon!(ms_per_sample(44100), 0.02267573, 1e-6);
        assert_eq!(
            duration_to_sample_count(Duration::from_secs(12 * 60), 44100),
            12 * 60 * 44100
        );
        assert_eq!(duration_to_sample_count(Duration::from_millis(100), 1000), 100);
    }
}
