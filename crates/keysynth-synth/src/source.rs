//! Pluggable sample sources.
//!
//! A [`SampleSource`] is the unit the scheduler renders from: one call per
//! frame with the current render time, returning a sample nominally in
//! `[-1, 1]`. Sources never clip; the scheduler clips after calling them.
//!
//! Closures `FnMut(f64) -> f64 + Send` are sources too, so a plain function
//! works wherever a source is expected:
//!
//! ```rust
//! use keysynth_synth::SampleSource;
//!
//! let mut square = |t: f64| if (220.0 * 2.0 * std::f64::consts::PI * t).sin() > 0.0 { 0.2 } else { -0.2 };
//! assert_eq!(square.render(0.001), 0.2);
//! ```

use crate::context::SynthesisContext;
use crate::oscillator::{Waveform, oscillate_with};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

/// Capability to produce the sample at a given render time.
///
/// Called on the render thread once per frame, so implementations must not
/// block, allocate, or take locks contended by other threads.
pub trait SampleSource: Send {
    /// Sample at render time `time` seconds.
    fn render(&mut self, time: f64) -> f64;
}

impl<F> SampleSource for F
where
    F: FnMut(f64) -> f64 + Send,
{
    #[inline]
    fn render(&mut self, time: f64) -> f64 {
        self(time)
    }
}

fn noise_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Always renders `0.0`. The scheduler's default source.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SampleSource for Silence {
    #[inline]
    fn render(&mut self, _time: f64) -> f64 {
        0.0
    }
}

/// A constant tone with no envelope.
///
/// # Example
///
/// ```rust
/// use keysynth_synth::{FixedTone, SampleSource, Waveform};
///
/// // 220 Hz square at 0.2
/// let mut tone = FixedTone::default();
/// assert_eq!(tone.render(0.001), 0.2);
/// ```
#[derive(Debug, Clone)]
pub struct FixedTone {
    waveform: Waveform,
    frequency: f64,
    amplitude: f64,
    rng: StdRng,
}

impl Default for FixedTone {
    /// 220 Hz square wave at amplitude 0.2.
    fn default() -> Self {
        Self::new(Waveform::Square, 220.0, 0.2)
    }
}

impl FixedTone {
    /// Create a tone. Noise is entropy-seeded.
    pub fn new(waveform: Waveform, frequency: f64, amplitude: f64) -> Self {
        Self {
            waveform,
            frequency,
            amplitude,
            rng: noise_rng(None),
        }
    }

    /// Seed the noise generator for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = noise_rng(Some(seed));
        self
    }

    /// Tone waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Tone frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Peak amplitude.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }
}

impl SampleSource for FixedTone {
    #[inline]
    fn render(&mut self, time: f64) -> f64 {
        self.amplitude * oscillate_with(self.frequency, time, self.waveform, &mut self.rng)
    }
}

/// Envelope-driven voice reading a shared [`SynthesisContext`].
///
/// Renders `volume · envelope(t) · waveform(frequency, t)`. When the envelope
/// is at zero the oscillator is skipped and the output is exactly `0.0`, so
/// an idle voice produces digital silence even with the noise waveform.
#[derive(Debug)]
pub struct VoiceSource {
    context: Arc<SynthesisContext>,
    waveform: Waveform,
    volume: f64,
    rng: StdRng,
}

impl VoiceSource {
    /// Create a voice. Noise is entropy-seeded.
    pub fn new(context: Arc<SynthesisContext>, waveform: Waveform, volume: f64) -> Self {
        Self {
            context,
            waveform,
            volume,
            rng: noise_rng(None),
        }
    }

    /// Seed the noise generator; `None` keeps entropy seeding.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.rng = noise_rng(seed);
        self
    }

    /// The shared context this voice reads.
    pub fn context(&self) -> &Arc<SynthesisContext> {
        &self.context
    }

    /// Voice waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Master volume.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

impl SampleSource for VoiceSource {
    #[inline]
    fn render(&mut self, time: f64) -> f64 {
        let amplitude = self.context.amplitude(time);
        if amplitude == 0.0 {
            return 0.0;
        }
        let frequency = self.context.frequency();
        self.volume * amplitude * oscillate_with(frequency, time, self.waveform, &mut self.rng)
    }
}

/// Sum of several sources, each with its own gain.
///
/// The sum is not normalized; keep the gains summing to at most 1.0 to stay
/// clear of the output clip.
#[derive(Default)]
pub struct Mixer {
    inputs: Vec<(Box<dyn SampleSource>, f64)>,
}

impl Mixer {
    /// Create an empty mixer (renders silence).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source with the given gain.
    pub fn with_input(mut self, source: impl SampleSource + 'static, gain: f64) -> Self {
        self.add_input(Box::new(source), gain);
        self
    }

    /// Add a boxed source with the given gain.
    pub fn add_input(&mut self, source: Box<dyn SampleSource>, gain: f64) {
        self.inputs.push((source, gain));
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the mixer has no inputs.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl core::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mixer")
            .field("inputs", &self.inputs.len())
            .finish()
    }
}

impl SampleSource for Mixer {
    #[inline]
    fn render(&mut self, time: f64) -> f64 {
        self.inputs
            .iter_mut()
            .map(|(source, gain)| *gain * source.render(time))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::AdsrEnvelope;

    #[test]
    fn test_silence() {
        let mut s = Silence;
        assert_eq!(s.render(0.0), 0.0);
        assert_eq!(s.render(123.4), 0.0);
    }

    #[test]
    fn test_closure_source() {
        let mut calls = 0;
        let mut source = |t: f64| {
            calls += 1;
            t * 2.0
        };
        assert_eq!(source.render(0.25), 0.5);
        assert_eq!(source.render(1.0), 2.0);
        drop(source);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_fixed_tone_default_square() {
        let mut tone = FixedTone::default();
        for i in 0..1000 {
            let s = tone.render(f64::from(i) / 44100.0);
            assert!(s == 0.2 || s == -0.2, "got {s}");
        }
    }

    #[test]
    fn test_fixed_tone_seeded_noise_repeats() {
        let mut a = FixedTone::new(Waveform::Noise, 0.0, 0.5).with_seed(3);
        let mut b = FixedTone::new(Waveform::Noise, 0.0, 0.5).with_seed(3);
        for i in 0..32 {
            let t = f64::from(i);
            let (x, y) = (a.render(t), b.render(t));
            assert_eq!(x, y);
            assert!(x.abs() <= 0.5);
        }
    }

    #[test]
    fn test_voice_silent_until_note_on() {
        let ctx = Arc::new(SynthesisContext::new(AdsrEnvelope::default()));
        let mut voice = VoiceSource::new(Arc::clone(&ctx), Waveform::Noise, 1.0);
        for i in 0..512 {
            assert_eq!(voice.render(f64::from(i) / 44100.0), 0.0);
        }
    }

    #[test]
    fn test_voice_follows_envelope_and_volume() {
        let ctx = Arc::new(SynthesisContext::new(AdsrEnvelope::new(0.0, 0.0, 0.5, 0.1, 1.0)));
        let mut voice = VoiceSource::new(Arc::clone(&ctx), Waveform::Sine, 0.4);
        ctx.note_on(0.0, 1.0);
        // sin(2π · 0.25) = 1, sustain 0.5, volume 0.4
        assert!((voice.render(0.25) - 0.2).abs() < 1e-12);
        ctx.note_off(1.0);
        assert_eq!(voice.render(1.25), 0.0);
    }

    #[test]
    fn test_mixer_sums_with_gain() {
        let mut mixer = Mixer::new()
            .with_input(|_t: f64| 0.5, 0.5)
            .with_input(|_t: f64| -1.0, 0.25);
        assert_eq!(mixer.len(), 2);
        assert!((mixer.render(0.0) - 0.0).abs() < 1e-12);

        let mut empty = Mixer::new();
        assert!(empty.is_empty());
        assert_eq!(empty.render(1.0), 0.0);
    }
}
