//! Mathematical utility functions for sample generation.
//!
//! # Clipping
//!
//! - [`clip`] - Symmetric clamp to `[-max, max]`
//!
//! # Pitch
//!
//! - [`hz_to_omega`] - Frequency to angular velocity
//! - [`semitone_ratio`] / [`note_frequency`] - Equal-temperament steps

use core::f64::consts::PI;
use libm::pow;

/// Symmetric clamp of `sample` to `[-max, max]`.
///
/// Applied once per sample after all oscillator and envelope contributions
/// have been mixed, and before quantization to the output width. The
/// operation is idempotent: `clip(clip(x, m), m) == clip(x, m)`.
///
/// Never panics, unlike [`f64::clamp`] with a negative bound. `NaN` input
/// maps to `-max`.
///
/// # Example
/// ```rust
/// use keysynth_core::clip;
///
/// assert_eq!(clip(1.5, 1.0), 1.0);
/// assert_eq!(clip(-3.0, 1.0), -1.0);
/// assert_eq!(clip(0.25, 1.0), 0.25);
/// ```
#[inline]
pub fn clip(sample: f64, max: f64) -> f64 {
    if sample >= 0.0 {
        sample.min(max)
    } else {
        sample.max(-max)
    }
}

/// Angular velocity `ω = 2πf` in radians per second.
#[inline]
pub fn hz_to_omega(freq_hz: f64) -> f64 {
    2.0 * PI * freq_hz
}

/// Frequency ratio of `semitones` equal-tempered steps (`2^(n/12)`).
#[inline]
pub fn semitone_ratio(semitones: f64) -> f64 {
    pow(2.0, semitones / 12.0)
}

/// Frequency of the note `semitones` steps above `base_hz`.
///
/// # Example
/// ```rust
/// use keysynth_core::note_frequency;
///
/// assert!((note_frequency(110.0, 12) - 220.0).abs() < 1e-9);
/// ```
#[inline]
pub fn note_frequency(base_hz: f64, semitones: i32) -> f64 {
    base_hz * semitone_ratio(f64::from(semitones))
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
