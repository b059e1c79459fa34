//! Stateless waveform generators.
//!
//! Every waveform is a pure function of frequency and absolute render time,
//! so a voice can be evaluated at any `t` without carrying phase state.
//! Angular velocity is `ω(f) = 2πf` throughout.

use core::f64::consts::FRAC_2_PI;
use core::fmt;
use core::str::FromStr;
use keysynth_core::hz_to_omega;
use rand::Rng;

/// Number of harmonics summed by [`Waveform::AnalogSaw`].
pub const ANALOG_SAW_HARMONICS: u32 = 39;

/// Oscillator waveform types
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Sine waveform: `sin(ωt)`.
    #[default]
    Sine,
    /// Square waveform: the sign of the sine, exactly `+1.0` or `-1.0`.
    ///
    /// A sine value of exactly zero maps to `-1.0`.
    Square,
    /// Triangle waveform: `asin(sin(ωt)) · 2/π`.
    Triangle,
    /// Band-limited sawtooth from the first 39 harmonics (additive synthesis).
    AnalogSaw,
    /// Closed-form sawtooth with a hard discontinuity at each period boundary.
    DigitalSaw,
    /// Uniform white noise in `[-1, 1]`, independent per call.
    Noise,
}

impl Waveform {
    /// All waveforms, in declaration order.
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::AnalogSaw,
        Waveform::DigitalSaw,
        Waveform::Noise,
    ];

    /// Configuration name (`"analog_saw"`).
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::AnalogSaw => "analog_saw",
            Waveform::DigitalSaw => "digital_saw",
            Waveform::Noise => "noise",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a waveform name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform '{0}' (expected one of: sine, square, triangle, analog_saw, digital_saw, noise)")]
pub struct ParseWaveformError(pub String);

impl FromStr for Waveform {
    type Err = ParseWaveformError;

    /// Accepts the configuration names case-insensitively, with `-` or `_`
    /// as separator, plus the short aliases `sin`, `sq`, `tri`, `saw`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sq" => Ok(Waveform::Square),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "analog_saw" | "saw" => Ok(Waveform::AnalogSaw),
            "digital_saw" => Ok(Waveform::DigitalSaw),
            "noise" | "white_noise" => Ok(Waveform::Noise),
            _ => Err(ParseWaveformError(s.to_string())),
        }
    }
}

/// Evaluate `waveform` at `time` seconds for a tone of `frequency` Hz.
///
/// [`Waveform::Noise`] draws from the thread-local entropy-seeded RNG; use
/// [`oscillate_with`] for reproducible noise.
///
/// # Example
///
/// ```rust
/// use keysynth_synth::{Waveform, oscillate};
///
/// // Quarter period of a 1 Hz sine is its peak
/// assert!((oscillate(1.0, 0.25, Waveform::Sine) - 1.0).abs() < 1e-12);
/// assert_eq!(oscillate(1.0, 0.25, Waveform::Square), 1.0);
/// ```
#[inline]
pub fn oscillate(frequency: f64, time: f64, waveform: Waveform) -> f64 {
    oscillate_with(frequency, time, waveform, &mut rand::thread_rng())
}

/// Evaluate `waveform`, drawing noise samples from `rng`.
///
/// Output lies in `[-1, 1]` for every waveform and every finite input.
#[inline]
pub fn oscillate_with<R: Rng + ?Sized>(
    frequency: f64,
    time: f64,
    waveform: Waveform,
    rng: &mut R,
) -> f64 {
    match waveform {
        Waveform::Sine => (hz_to_omega(frequency) * time).sin(),
        Waveform::Square => {
            if (hz_to_omega(frequency) * time).sin() > 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => {
            // asin can return a hair outside ±π/2 after rounding
            ((hz_to_omega(frequency) * time).sin().asin() * FRAC_2_PI).clamp(-1.0, 1.0)
        }
        Waveform::AnalogSaw => analog_saw(frequency, time, ANALOG_SAW_HARMONICS),
        Waveform::DigitalSaw => digital_saw(frequency, time),
        Waveform::Noise => rng.gen_range(-1.0..=1.0),
    }
}

/// Additive sawtooth: `(2/π) · Σ_{n=1}^{harmonics} sin(nωt)/n`.
///
/// More harmonics give a sharper edge. The partial sum overshoots near the
/// edge (Gibbs ripple, peaking around 1.18 for 39 harmonics), so the result
/// is clamped to `[-1, 1]`. The scheduler's output clip would flatten the
/// same peaks at full volume.
pub fn analog_saw(frequency: f64, time: f64, harmonics: u32) -> f64 {
    let phase = hz_to_omega(frequency) * time;
    let sum: f64 = (1..=harmonics)
        .map(|n| {
            let n = f64::from(n);
            (n * phase).sin() / n
        })
        .sum();
    (sum * FRAC_2_PI).clamp(-1.0, 1.0)
}

/// Closed-form sawtooth: `(2/π) · (fπ · (t mod 1/f) − π/2)`, evaluated in
/// the algebraically equal form `2f · (t mod 1/f) − 1`.
///
/// Ramps from `-1.0` at the start of each period toward `+1.0` and jumps back
/// at the boundary. `t mod 1/f` is taken Euclidean so negative times stay in
/// range. A non-positive frequency produces `0.0`.
fn digital_saw(frequency: f64, time: f64) -> f64 {
    if frequency <= 0.0 || !frequency.is_finite() {
        return 0.0;
    }
    let period = 1.0 / frequency;
    let position = time.rem_euclid(period);
    (2.0 * frequency * position - 1.0).clamp(-1.0, 1.0)
}
