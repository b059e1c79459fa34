//! ADSR envelope generator for synthesis.
//!
//! Provides linear attack-decay-sustain-release envelopes evaluated directly
//! from the note trigger timestamps. There is no per-sample state: the phase
//! is recomputed from elapsed time on every call, so the envelope can be read
//! at arbitrary render times by the render thread while the note-input thread
//! moves the triggers.

use core::sync::atomic::{AtomicBool, Ordering};
use keysynth_core::{AtomicF64, lerp};

/// Amplitudes at or below this level are reported as exactly `0.0`.
///
/// The floor keeps released notes from bleeding tiny or negative levels. It
/// also means the envelope steps from `0.0001` to `0.0` instead of reaching
/// zero continuously; that step is intended.
pub const AMPLITUDE_FLOOR: f64 = 0.0001;

/// ADSR envelope states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// No note has sounded yet, or the release has finished.
    #[default]
    Idle,
    /// Attack phase: linear ramp from zero to the start amplitude.
    Attack,
    /// Decay phase: linear fall from start amplitude to sustain amplitude.
    Decay,
    /// Sustain phase: held at sustain amplitude while the note is on.
    Sustain,
    /// Release phase: linear fall from sustain amplitude to zero.
    Release,
}

/// Shape of a linear ADSR envelope.
///
/// Times are in seconds. The shape is configuration: it is fixed once a
/// voice is built and shared read-only with the render thread.
///
/// # Example
///
/// ```rust
/// use keysynth_synth::AdsrEnvelope;
///
/// let mut env = AdsrEnvelope::default();
/// env.set_attack(0.1);
/// env.set_sustain(0.8);
///
/// // Halfway through the attack ramp
/// assert!((env.amplitude_at(0.05, 0.0, 0.0, true) - 0.5).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsrEnvelope {
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    start: f64,
}

impl Default for AdsrEnvelope {
    /// Attack 0.1 s, decay 0.01 s, sustain 0.8, release 0.2 s, start 1.0.
    fn default() -> Self {
        Self::new(0.1, 0.01, 0.8, 0.2, 1.0)
    }
}

impl AdsrEnvelope {
    /// Create an envelope shape. Negative times are treated as zero and
    /// levels are clamped to `[0, 1]`.
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64, start: f64) -> Self {
        let mut env = Self {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.0,
            release: 0.0,
            start: 0.0,
        };
        env.set_attack(attack);
        env.set_decay(decay);
        env.set_sustain(sustain);
        env.set_release(release);
        env.set_start_amplitude(start);
        env
    }

    /// Set attack time in seconds.
    pub fn set_attack(&mut self, seconds: f64) {
        self.attack = seconds.max(0.0);
    }

    /// Get attack time in seconds.
    pub fn attack(&self) -> f64 {
        self.attack
    }

    /// Set decay time in seconds.
    pub fn set_decay(&mut self, seconds: f64) {
        self.decay = seconds.max(0.0);
    }

    /// Get decay time in seconds.
    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Set sustain amplitude (0.0 to 1.0).
    pub fn set_sustain(&mut self, level: f64) {
        self.sustain = level.clamp(0.0, 1.0);
    }

    /// Get sustain amplitude.
    pub fn sustain(&self) -> f64 {
        self.sustain
    }

    /// Set release time in seconds.
    pub fn set_release(&mut self, seconds: f64) {
        self.release = seconds.max(0.0);
    }

    /// Get release time in seconds.
    pub fn release(&self) -> f64 {
        self.release
    }

    /// Set the peak amplitude reached at the end of the attack (0.0 to 1.0).
    pub fn set_start_amplitude(&mut self, level: f64) {
        self.start = level.clamp(0.0, 1.0);
    }

    /// Get the peak amplitude reached at the end of the attack.
    pub fn start_amplitude(&self) -> f64 {
        self.start
    }

    /// Amplitude at `time` given the trigger timestamps.
    ///
    /// While the note is on, the level is taken from the time elapsed since
    /// `on_time`. After note-off it falls linearly from the sustain level to
    /// zero over the release time, measured from `off_time`; a note released
    /// mid-attack therefore jumps to the sustain level first. Results at or
    /// below [`AMPLITUDE_FLOOR`] are `0.0`.
    pub fn amplitude_at(&self, time: f64, on_time: f64, off_time: f64, note_on: bool) -> f64 {
        let amplitude = if note_on {
            let lifetime = time - on_time;
            if lifetime <= self.attack {
                if self.attack > 0.0 {
                    (lifetime / self.attack) * self.start
                } else {
                    self.start
                }
            } else if lifetime <= self.attack + self.decay {
                let progress = (lifetime - self.attack) / self.decay;
                lerp(self.start, self.sustain, progress)
            } else {
                self.sustain
            }
        } else if self.release > 0.0 {
            // A read that races a note-off can see `time` slightly before it
            let released = (time - off_time).max(0.0);
            self.sustain * (1.0 - released / self.release)
        } else {
            0.0
        };

        if amplitude <= AMPLITUDE_FLOOR {
            0.0
        } else {
            amplitude
        }
    }

    /// Phase of the envelope at `time` for the given triggers.
    pub fn state_at(&self, time: f64, on_time: f64, off_time: f64, note_on: bool) -> EnvelopeState {
        if note_on {
            let lifetime = time - on_time;
            if lifetime <= self.attack {
                EnvelopeState::Attack
            } else if lifetime <= self.attack + self.decay {
                EnvelopeState::Decay
            } else {
                EnvelopeState::Sustain
            }
        } else if self.amplitude_at(time, on_time, off_time, false) > 0.0 {
            EnvelopeState::Release
        } else {
            EnvelopeState::Idle
        }
    }
}

/// ADSR envelope with note triggers that can be moved from another thread.
///
/// [`note_on`](Self::note_on) and [`note_off`](Self::note_off) are the only
/// mutations. Each trigger field is a single atomic scalar with one writer
/// (the note-input thread) and one reader (the render thread). A render that
/// races a trigger sees either the old or the new timestamp for at most one
/// sample; the trigger time is published before the note flag, so a reader
/// that observes a new flag also observes its timestamp.
///
/// A note-on during the release restarts the attack ramp from zero toward
/// the start amplitude rather than from the current level, which produces an
/// audible step on fast retriggering.
///
/// # Example
///
/// ```rust
/// use keysynth_synth::{AdsrEnvelope, EnvelopeGenerator, EnvelopeState};
///
/// let env = EnvelopeGenerator::new(AdsrEnvelope::default());
/// assert_eq!(env.state(0.0), EnvelopeState::Idle);
///
/// env.note_on(1.0);
/// assert_eq!(env.state(1.5), EnvelopeState::Sustain);
///
/// env.note_off(2.0);
/// assert_eq!(env.amplitude(2.0 + env.shape().release()), 0.0);
/// ```
#[derive(Debug)]
pub struct EnvelopeGenerator {
    shape: AdsrEnvelope,
    on_time: AtomicF64,
    off_time: AtomicF64,
    note_on: AtomicBool,
    triggered: AtomicBool,
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new(AdsrEnvelope::default())
    }
}

impl EnvelopeGenerator {
    /// Create an idle envelope with the given shape.
    pub fn new(shape: AdsrEnvelope) -> Self {
        Self {
            shape,
            on_time: AtomicF64::new(0.0),
            off_time: AtomicF64::new(0.0),
            note_on: AtomicBool::new(false),
            triggered: AtomicBool::new(false),
        }
    }

    /// Envelope shape.
    pub fn shape(&self) -> &AdsrEnvelope {
        &self.shape
    }

    /// Start the attack at `time`.
    pub fn note_on(&self, time: f64) {
        self.on_time.store(time, Ordering::Relaxed);
        self.triggered.store(true, Ordering::Relaxed);
        self.note_on.store(true, Ordering::Release);
    }

    /// Start the release at `time`.
    pub fn note_off(&self, time: f64) {
        self.off_time.store(time, Ordering::Relaxed);
        self.note_on.store(false, Ordering::Release);
    }

    /// Whether a note is currently held.
    pub fn is_note_on(&self) -> bool {
        self.note_on.load(Ordering::Acquire)
    }

    /// Amplitude at render time `time`. Zero until the first note-on.
    #[inline]
    pub fn amplitude(&self, time: f64) -> f64 {
        let note_on = self.note_on.load(Ordering::Acquire);
        if !self.triggered.load(Ordering::Relaxed) {
            return 0.0;
        }
        self.shape.amplitude_at(
            time,
            self.on_time.load(Ordering::Relaxed),
            self.off_time.load(Ordering::Relaxed),
            note_on,
        )
    }

    /// Envelope phase at render time `time`.
    pub fn state(&self, time: f64) -> EnvelopeState {
        let note_on = self.note_on.load(Ordering::Acquire);
        if !self.triggered.load(Ordering::Relaxed) {
            return EnvelopeState::Idle;
        }
        self.shape.state_at(
            time,
            self.on_time.load(Ordering::Relaxed),
            self.off_time.load(Ordering::Relaxed),
            note_on,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> AdsrEnvelope {
        AdsrEnvelope::new(0.1, 0.2, 0.6, 0.5, 1.0)
    }

    #[test]
    fn test_default_shape() {
        let env = AdsrEnvelope::default();
        assert_eq!(env.attack(), 0.1);
        assert_eq!(env.decay(), 0.01);
        assert_eq!(env.sustain(), 0.8);
        assert_eq!(env.release(), 0.2);
        assert_eq!(env.start_amplitude(), 1.0);
    }

    #[test]
    fn test_setters_clamp() {
        let mut env = AdsrEnvelope::default();
        env.set_attack(-1.0);
        env.set_sustain(3.0);
        env.set_start_amplitude(-0.5);
        assert_eq!(env.attack(), 0.0);
        assert_eq!(env.sustain(), 1.0);
        assert_eq!(env.start_amplitude(), 0.0);
    }

    #[test]
    fn test_attack_is_linear() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        assert!((env.amplitude(0.05) - 0.5).abs() < 1e-9);
        assert!((env.amplitude(0.025) - 0.25).abs() < 1e-9);
        assert_eq!(env.state(0.05), EnvelopeState::Attack);
    }

    #[test]
    fn test_attack_end_reaches_start_amplitude() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        assert!((env.amplitude(0.1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_decay_interpolates_to_sustain() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        // Halfway through decay: 1.0 -> 0.6
        assert!((env.amplitude(0.2) - 0.8).abs() < 1e-9);
        assert_eq!(env.state(0.2), EnvelopeState::Decay);
        assert!((env.amplitude(0.3) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_sustain_holds() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        assert_eq!(env.amplitude(1.0), 0.6);
        assert_eq!(env.amplitude(100.0), 0.6);
        assert_eq!(env.state(1.0), EnvelopeState::Sustain);
    }

    #[test]
    fn test_release_falls_to_zero() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        env.note_off(2.0);
        assert!((env.amplitude(2.25) - 0.3).abs() < 1e-9);
        assert_eq!(env.state(2.25), EnvelopeState::Release);
        assert_eq!(env.amplitude(2.5), 0.0);
        assert_eq!(env.amplitude(10.0), 0.0);
        assert_eq!(env.state(10.0), EnvelopeState::Idle);
    }

    #[test]
    fn test_floor_clamps_small_levels() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        env.note_off(1.0);
        // 0.6 * (1 - 0.49995/0.5) = 0.00006 < floor
        assert_eq!(env.amplitude(1.49995), 0.0);
        // Just above the floor still sounds
        assert!(env.amplitude(1.4995) > AMPLITUDE_FLOOR);
    }

    #[test]
    fn test_idle_before_first_note() {
        let env = EnvelopeGenerator::new(shape());
        assert_eq!(env.amplitude(0.0), 0.0);
        assert_eq!(env.amplitude(0.3), 0.0);
        assert_eq!(env.state(0.0), EnvelopeState::Idle);
        assert!(!env.is_note_on());
    }

    #[test]
    fn test_zero_attack_starts_at_peak() {
        let env = EnvelopeGenerator::new(AdsrEnvelope::new(0.0, 0.0, 0.5, 0.0, 1.0));
        env.note_on(0.0);
        assert_eq!(env.amplitude(0.0), 1.0);
        assert_eq!(env.amplitude(0.001), 0.5);
        env.note_off(1.0);
        assert_eq!(env.amplitude(1.0), 0.0);
    }

    #[test]
    fn test_retrigger_during_release_restarts_from_zero() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        env.note_off(1.0);
        let before = env.amplitude(1.1);
        assert!(before > 0.4);

        env.note_on(1.1);
        // The attack ramp restarts from zero, not from the release level
        assert_eq!(env.amplitude(1.1), 0.0);
        assert_eq!(env.state(1.1), EnvelopeState::Attack);
    }

    #[test]
    fn test_release_mid_attack_uses_sustain_level() {
        let env = EnvelopeGenerator::new(shape());
        env.note_on(0.0);
        env.note_off(0.05);
        assert!((env.amplitude(0.05) - 0.6).abs() < 1e-9);
    }
}
