//! Shared synthesis state for a single voice.

use crate::envelope::{AdsrEnvelope, EnvelopeGenerator, EnvelopeState};
use core::sync::atomic::Ordering;
use keysynth_core::AtomicF64;

/// Frequency and envelope state of the single live voice.
///
/// The context is shared (`Arc`) between the note-input path and the render
/// thread. The input path mutates it only through [`note_on`](Self::note_on),
/// [`note_off`](Self::note_off) and [`set_frequency`](Self::set_frequency);
/// the render thread only reads. Every field is an independent atomic
/// scalar, so no lock is taken on either side.
#[derive(Debug, Default)]
pub struct SynthesisContext {
    envelope: EnvelopeGenerator,
    frequency: AtomicF64,
}

impl SynthesisContext {
    /// Create an idle context with the given envelope shape.
    pub fn new(shape: AdsrEnvelope) -> Self {
        Self {
            envelope: EnvelopeGenerator::new(shape),
            frequency: AtomicF64::new(0.0),
        }
    }

    /// Set the voice frequency and start the attack at `time`.
    ///
    /// The frequency is published before the trigger so the first sample of
    /// the new note is rendered at the new pitch.
    pub fn note_on(&self, time: f64, frequency_hz: f64) {
        self.set_frequency(frequency_hz);
        self.envelope.note_on(time);
    }

    /// Start the release at `time`.
    pub fn note_off(&self, time: f64) {
        self.envelope.note_off(time);
    }

    /// Change the target frequency without retriggering the envelope.
    pub fn set_frequency(&self, frequency_hz: f64) {
        self.frequency.store(frequency_hz, Ordering::Release);
    }

    /// Current voice frequency in Hz.
    #[inline]
    pub fn frequency(&self) -> f64 {
        self.frequency.load(Ordering::Acquire)
    }

    /// Envelope amplitude at render time `time`.
    #[inline]
    pub fn amplitude(&self, time: f64) -> f64 {
        self.envelope.amplitude(time)
    }

    /// Envelope phase at render time `time`.
    pub fn state(&self, time: f64) -> EnvelopeState {
        self.envelope.state(time)
    }

    /// The voice envelope.
    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }
}
